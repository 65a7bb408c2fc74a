//! Asset custody: holdings and escrow vaults.

use std::collections::HashMap;

use tracing::trace;

use crate::address::VaultId;
use crate::asset::AssetId;
use crate::error::CustodyError;
use crate::identity::Identity;

pub type CustodyResult<T> = std::result::Result<T, CustodyError>;

/// The asset-custody collaborator.
///
/// Every method validates before mutating: an `Err` leaves all
/// balances untouched.
pub trait Custody {
    /// Open `vault` and move `amount` of `asset` into it from `source`.
    fn deposit(
        &mut self,
        source: &Identity,
        asset: &AssetId,
        vault: &VaultId,
        amount: u64,
    ) -> CustodyResult<()>;

    /// Drain `vault` fully into `destination` and close it.
    ///
    /// `amount` must equal the vault balance.
    fn payout(&mut self, vault: &VaultId, destination: &Identity, amount: u64) -> CustodyResult<()>;

    /// Current vault balance. Closed or unknown vaults hold 0.
    fn balance(&self, vault: &VaultId) -> u64;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Vault {
    asset: AssetId,
    balance: u64,
    open: bool,
}

/// In-memory custody store.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    holdings: HashMap<(Identity, AssetId), u64>,
    vaults: HashMap<VaultId, Vault>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund a holding from outside the escrow system.
    pub fn credit(&mut self, owner: &Identity, asset: &AssetId, amount: u64) -> CustodyResult<()> {
        let entry = self.holdings.entry((*owner, *asset)).or_default();
        *entry = entry.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    pub fn holding(&self, owner: &Identity, asset: &AssetId) -> u64 {
        self.holdings.get(&(*owner, *asset)).copied().unwrap_or(0)
    }

    pub fn is_open(&self, vault: &VaultId) -> bool {
        self.vaults.get(vault).is_some_and(|v| v.open)
    }
}

impl Custody for Ledger {
    fn deposit(
        &mut self,
        source: &Identity,
        asset: &AssetId,
        vault: &VaultId,
        amount: u64,
    ) -> CustodyResult<()> {
        if self.vaults.contains_key(vault) {
            return Err(CustodyError::VaultExists(vault.to_string()));
        }
        let available = self.holding(source, asset);
        if available < amount {
            return Err(CustodyError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        self.holdings.insert((*source, *asset), available - amount);
        self.vaults.insert(
            *vault,
            Vault {
                asset: *asset,
                balance: amount,
                open: true,
            },
        );
        trace!(%vault, amount, "vault opened");
        Ok(())
    }

    fn payout(
        &mut self,
        vault: &VaultId,
        destination: &Identity,
        amount: u64,
    ) -> CustodyResult<()> {
        let (asset, balance) = match self.vaults.get(vault) {
            Some(v) if v.open => (v.asset, v.balance),
            _ => return Err(CustodyError::VaultClosed(vault.to_string())),
        };
        if amount != balance {
            return Err(CustodyError::PartialPayout {
                requested: amount,
                balance,
            });
        }
        let current = self.holding(destination, &asset);
        let credited = current.checked_add(amount).ok_or(CustodyError::Overflow)?;

        self.holdings.insert((*destination, asset), credited);
        if let Some(v) = self.vaults.get_mut(vault) {
            v.balance = 0;
            v.open = false;
        }
        trace!(%vault, amount, "vault drained and closed");
        Ok(())
    }

    fn balance(&self, vault: &VaultId) -> u64 {
        match self.vaults.get(vault) {
            Some(v) if v.open => v.balance,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{find_instance_id, DEFAULT_TAG};
    use crate::identity::Parties;

    const MINT: AssetId = AssetId::new([9; 32]);

    fn vault() -> VaultId {
        let p = Parties {
            sender: Identity::new([1; 32]),
            intermediary: Identity::new([2; 32]),
            receiver: Identity::new([3; 32]),
            arbitrator: Identity::new([4; 32]),
        };
        find_instance_id(DEFAULT_TAG, &MINT, &p).unwrap().0.vault()
    }

    #[test]
    fn deposit_then_payout() {
        let alice = Identity::new([1; 32]);
        let bob = Identity::new([2; 32]);
        let v = vault();
        let mut ledger = Ledger::new();
        ledger.credit(&alice, &MINT, 100).unwrap();

        ledger.deposit(&alice, &MINT, &v, 60).unwrap();
        assert_eq!(ledger.holding(&alice, &MINT), 40);
        assert_eq!(ledger.balance(&v), 60);
        assert!(ledger.is_open(&v));

        ledger.payout(&v, &bob, 60).unwrap();
        assert_eq!(ledger.holding(&bob, &MINT), 60);
        assert_eq!(ledger.balance(&v), 0);
        assert!(!ledger.is_open(&v));
    }

    #[test]
    fn failures_leave_balances_untouched() {
        let alice = Identity::new([1; 32]);
        let v = vault();
        let mut ledger = Ledger::new();
        ledger.credit(&alice, &MINT, 10).unwrap();

        assert_eq!(
            ledger.deposit(&alice, &MINT, &v, 11),
            Err(CustodyError::InsufficientFunds {
                requested: 11,
                available: 10
            })
        );
        assert_eq!(ledger.holding(&alice, &MINT), 10);
        assert!(!ledger.is_open(&v));

        ledger.deposit(&alice, &MINT, &v, 10).unwrap();
        assert!(matches!(
            ledger.payout(&v, &alice, 5),
            Err(CustodyError::PartialPayout { .. })
        ));
        assert_eq!(ledger.balance(&v), 10);

        ledger.payout(&v, &alice, 10).unwrap();
        assert!(matches!(
            ledger.payout(&v, &alice, 0),
            Err(CustodyError::VaultClosed(_))
        ));
        // closed vaults cannot be reopened
        assert!(matches!(
            ledger.deposit(&alice, &MINT, &v, 1),
            Err(CustodyError::VaultExists(_))
        ));
    }
}
