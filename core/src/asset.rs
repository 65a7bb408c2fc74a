//! The fungible asset held in escrow.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::identity::Identity;
use crate::{EscrowError, Result};

/// Identifier of a fungible asset (e.g. a token mint).
///
/// Shares the textual forms of [`Identity`].
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct AssetId(Identity);

impl AssetId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(Identity::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl AsRef<[u8]> for AssetId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for AssetId {
    type Err = IdentityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Enforce the non-zero amount invariant for a deposit.
pub fn validate_amount(amount: u64) -> Result<u64> {
    if amount == 0 {
        return Err(EscrowError::InvalidAmount);
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amount_rejected() {
        assert_eq!(validate_amount(0), Err(EscrowError::InvalidAmount));
        assert_eq!(validate_amount(1_000_000), Ok(1_000_000));
    }

    #[test]
    fn asset_id_text_roundtrip() {
        let mint = AssetId::new([42u8; 32]);
        let parsed: AssetId = mint.to_string().parse().unwrap();
        assert_eq!(parsed, mint);
    }
}
