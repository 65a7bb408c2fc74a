//! Identities of the parties participating in an escrow.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bincode::{Decode, Encode};
use ed25519_dalek::VerifyingKey;
#[cfg(feature = "json")]
use hex::serde as hex_serde;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, IdentityError};

/// A party's identity: the 32-byte Ed25519 public key it signs with.
///
/// Displays as base58. Parses from `0x`-prefixed or bare 64-digit hex,
/// base58, or standard base64.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct Identity(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] [u8; 32]);

impl Identity {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret the identity as an Ed25519 verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, AuthError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| AuthError::InvalidPublicKey)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, IdentityError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl From<[u8; 32]> for Identity {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<&VerifyingKey> for Identity {
    fn from(value: &VerifyingKey) -> Self {
        Self(value.to_bytes())
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl std::str::FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentityError::EmptyIdentity);
        }
        if let Some(h) = s.strip_prefix("0x") {
            return Self::from_slice(&hex::decode(h)?);
        }
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Self::from_slice(&hex::decode(s)?);
        }
        match bs58::decode(s).into_vec() {
            Ok(bytes) => Self::from_slice(&bytes),
            Err(b58) => match BASE64.decode(s) {
                Ok(bytes) => Self::from_slice(&bytes),
                // neither alphabet fits; report the base58 failure
                Err(_) => Err(b58.into()),
            },
        }
    }
}

/// The fixed role a party holds in an escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Party {
    /// Depositor; refunded on cancellation.
    Sender,
    /// Payee on normal settlement; confirms.
    Intermediary,
    /// Confirming counterparty.
    Receiver,
    /// Dispute adjudicator.
    Arbitrator,
}

impl AsRef<str> for Party {
    fn as_ref(&self) -> &str {
        match self {
            Self::Sender => "sender",
            Self::Intermediary => "intermediary",
            Self::Receiver => "receiver",
            Self::Arbitrator => "arbitrator",
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// The four identities bound to an escrow, set once at creation.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct Parties {
    pub sender: Identity,
    pub intermediary: Identity,
    pub receiver: Identity,
    pub arbitrator: Identity,
}

impl Parties {
    /// Identity holding `party`.
    pub fn get(&self, party: Party) -> &Identity {
        match party {
            Party::Sender => &self.sender,
            Party::Intermediary => &self.intermediary,
            Party::Receiver => &self.receiver,
            Party::Arbitrator => &self.arbitrator,
        }
    }

    /// First role held by `identity`, in sender, intermediary, receiver,
    /// arbitrator order.
    pub fn role_of(&self, identity: &Identity) -> Option<Party> {
        [
            Party::Sender,
            Party::Intermediary,
            Party::Receiver,
            Party::Arbitrator,
        ]
        .into_iter()
        .find(|p| self.get(*p) == identity)
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr as _;

    use super::*;

    #[test]
    fn parse_formats() {
        let id = Identity::new([7u8; 32]);

        let b58 = id.to_string();
        assert_eq!(Identity::from_str(&b58).unwrap(), id);

        let hex_prefixed = format!("0x{}", hex::encode([7u8; 32]));
        assert_eq!(Identity::from_str(&hex_prefixed).unwrap(), id);

        let hex_bare = hex::encode([7u8; 32]);
        assert_eq!(Identity::from_str(&hex_bare).unwrap(), id);

        let b64 = BASE64.encode([7u8; 32]);
        assert_eq!(Identity::from_str(&b64).unwrap(), id);
    }

    #[test]
    fn parse_failures() {
        assert_eq!(
            Identity::from_str("  ").unwrap_err(),
            IdentityError::EmptyIdentity
        );
        assert_eq!(
            Identity::from_str("0xdeadbeef").unwrap_err(),
            IdentityError::InvalidLength(4)
        );
        assert!(matches!(
            Identity::from_str("0xzz"),
            Err(IdentityError::Hex(_))
        ));
    }

    #[test]
    fn role_lookup() {
        let parties = Parties {
            sender: Identity::new([1; 32]),
            intermediary: Identity::new([2; 32]),
            receiver: Identity::new([3; 32]),
            arbitrator: Identity::new([4; 32]),
        };
        assert_eq!(parties.role_of(&Identity::new([3; 32])), Some(Party::Receiver));
        assert_eq!(parties.role_of(&Identity::new([9; 32])), None);
        assert_eq!(parties.get(Party::Arbitrator), &Identity::new([4; 32]));
    }

    #[test]
    fn verifying_key_roundtrip() {
        let sk = ed25519_dalek::SigningKey::from_bytes(&[3u8; 32]);
        let id = Identity::from(&sk.verifying_key());
        assert_eq!(id.verifying_key().unwrap(), sk.verifying_key());
    }
}
