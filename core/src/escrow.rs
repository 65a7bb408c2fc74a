//! The escrow record, its status machine and invariant helpers.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::address::{self, InstanceId, VaultId};
use crate::asset::AssetId;
use crate::identity::{Identity, Parties, Party};
use crate::{EscrowError, Result};

/// Lifecycle of an escrow.
///
/// Never stored: always computed by [`EscrowRecord::status`].
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscrowStatus {
    /// Funded; awaiting confirmations.
    Pending,
    /// Both the intermediary and the receiver confirmed.
    Confirmed,
    /// A party raised a dispute; only the arbitrator can settle it.
    Disputed,
    /// Funds paid out to the intermediary. Terminal.
    Released,
    /// Funds returned to the sender. Terminal.
    Cancelled,
}

impl EscrowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Cancelled)
    }

    /// Whether the vault must still hold the full amount.
    pub fn holds_funds(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Disputed => "disputed",
            Self::Released => "released",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A role whose confirmation gates normal-path release.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Role {
    Intermediary,
    Receiver,
}

impl From<Role> for Party {
    fn from(value: Role) -> Self {
        match value {
            Role::Intermediary => Party::Intermediary,
            Role::Receiver => Party::Receiver,
        }
    }
}

/// The arbitrator's ruling on a disputed escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Resolution {
    /// Pay the intermediary.
    Release,
    /// Refund the sender.
    Cancel,
}

/// How a closed escrow was settled.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Settlement {
    Released,
    Cancelled,
}

impl From<Resolution> for Settlement {
    fn from(value: Resolution) -> Self {
        match value {
            Resolution::Release => Self::Released,
            Resolution::Cancel => Self::Cancelled,
        }
    }
}

/// Persistent state of one escrow instance.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct EscrowRecord {
    /// Addressing tag the id was derived under.
    pub tag: Vec<u8>,
    /// Canonical nonce found at creation.
    pub nonce: u8,
    pub asset: AssetId,
    pub parties: Parties,
    /// Units held in the vault while open.
    pub amount: u64,
    /// Unix timestamp (seconds).
    pub deadline: i64,
    pub intermediary_confirmed: bool,
    pub receiver_confirmed: bool,
    /// Set by Dispute; only cleared by settlement.
    pub disputed: bool,
    /// Terminal override. Once set the record is closed.
    pub settlement: Option<Settlement>,
}

impl EscrowRecord {
    /// Fresh, unconfirmed record.
    pub fn new(
        tag: &[u8],
        nonce: u8,
        asset: AssetId,
        parties: Parties,
        amount: u64,
        deadline: i64,
    ) -> Self {
        Self {
            tag: tag.to_vec(),
            nonce,
            asset,
            parties,
            amount,
            deadline,
            intermediary_confirmed: false,
            receiver_confirmed: false,
            disputed: false,
            settlement: None,
        }
    }

    /// Status as a function of flags, the dispute marker and settlement.
    pub fn status(&self) -> EscrowStatus {
        match self.settlement {
            Some(Settlement::Released) => EscrowStatus::Released,
            Some(Settlement::Cancelled) => EscrowStatus::Cancelled,
            None if self.disputed => EscrowStatus::Disputed,
            None if self.intermediary_confirmed && self.receiver_confirmed => {
                EscrowStatus::Confirmed
            }
            None => EscrowStatus::Pending,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.settlement.is_some()
    }

    pub fn confirmed(&self, role: Role) -> bool {
        match role {
            Role::Intermediary => self.intermediary_confirmed,
            Role::Receiver => self.receiver_confirmed,
        }
    }

    pub(crate) fn set_confirmed(&mut self, role: Role, value: bool) {
        match role {
            Role::Intermediary => self.intermediary_confirmed = value,
            Role::Receiver => self.receiver_confirmed = value,
        }
    }

    pub fn party(&self, party: Party) -> &Identity {
        self.parties.get(party)
    }

    /// Re-derive the instance id from stored fields.
    pub fn verify_address(&self, id: &InstanceId) -> Result<()> {
        address::verify_instance_id(id, &self.tag, &self.asset, &self.parties, self.nonce)
    }

    /// Balance the vault must hold right now.
    pub fn expected_vault_balance(&self) -> u64 {
        if self.status().holds_funds() {
            self.amount
        } else {
            0
        }
    }

    /// Check the custody invariant against an observed vault balance.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidEscrowState`] on divergence.
    pub fn check_custody(&self, vault: &VaultId, balance: u64) -> Result<()> {
        let expected = self.expected_vault_balance();
        if balance != expected {
            tracing::error!(
                %vault,
                balance,
                expected,
                status = %self.status(),
                "custody invariant violated"
            );
            return Err(EscrowError::InvalidEscrowState);
        }
        Ok(())
    }

    /// Binary encoding for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (record, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EscrowRecord {
        EscrowRecord::new(
            address::DEFAULT_TAG,
            0,
            AssetId::new([9; 32]),
            Parties {
                sender: Identity::new([1; 32]),
                intermediary: Identity::new([2; 32]),
                receiver: Identity::new([3; 32]),
                arbitrator: Identity::new([4; 32]),
            },
            1_000_000,
            60,
        )
    }

    #[test]
    fn status_follows_flags() {
        let mut r = record();
        assert_eq!(r.status(), EscrowStatus::Pending);

        r.set_confirmed(Role::Intermediary, true);
        assert_eq!(r.status(), EscrowStatus::Pending);

        r.set_confirmed(Role::Receiver, true);
        assert_eq!(r.status(), EscrowStatus::Confirmed);

        r.set_confirmed(Role::Receiver, false);
        assert_eq!(r.status(), EscrowStatus::Pending);
    }

    #[test]
    fn overrides_take_precedence() {
        let mut r = record();
        r.set_confirmed(Role::Intermediary, true);
        r.set_confirmed(Role::Receiver, true);
        r.disputed = true;
        assert_eq!(r.status(), EscrowStatus::Disputed);

        r.settlement = Some(Settlement::Cancelled);
        assert_eq!(r.status(), EscrowStatus::Cancelled);
        assert!(r.status().is_terminal());
        assert!(r.is_closed());
    }

    #[test]
    fn custody_invariant() {
        let mut r = record();
        let (id, _) = address::find_instance_id(&r.tag, &r.asset, &r.parties).unwrap();
        let vault = id.vault();
        assert!(r.check_custody(&vault, 1_000_000).is_ok());
        assert_eq!(
            r.check_custody(&vault, 999_999),
            Err(EscrowError::InvalidEscrowState)
        );

        r.settlement = Some(Settlement::Released);
        assert!(r.check_custody(&vault, 0).is_ok());
        assert!(r.check_custody(&vault, 1_000_000).is_err());
    }

    #[test]
    fn binary_encoding_keeps_status_inputs() {
        let mut r = record();
        r.set_confirmed(Role::Receiver, true);
        r.disputed = true;
        let bytes = r.to_bytes().unwrap();
        let decoded = EscrowRecord::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, r);
        assert_eq!(decoded.status(), EscrowStatus::Disputed);

        assert!(matches!(
            EscrowRecord::from_bytes(&bytes[..4]),
            Err(EscrowError::Encoding(_))
        ));
    }
}
