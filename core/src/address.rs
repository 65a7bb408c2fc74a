//! Deterministic instance addressing.
//!
//! An escrow lives at an id derived from its five-tuple
//! `(asset, sender, intermediary, receiver, arbitrator)` and a one-byte
//! nonce. A digest is only accepted as an id when it is *not* a valid
//! Ed25519 point, so no signing key can ever exist for an instance or
//! its vault. The canonical nonce is the lowest one producing a valid id.

use bincode::{Decode, Encode};
use ed25519_dalek::VerifyingKey;
#[cfg(feature = "json")]
use hex::serde as hex_serde;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::trace;

use crate::asset::AssetId;
use crate::error::IdentityError;
use crate::identity::Parties;
use crate::{EscrowError, Result};

/// Default tag prefixed to every instance derivation.
pub const DEFAULT_TAG: &[u8] = b"escrow";

/// Domain separator appended after the nonce.
const INSTANCE_DOMAIN: &[u8] = b"triad-instance";

/// Domain separator for vault ids.
const VAULT_DOMAIN: &[u8] = b"vault";

/// Identifier of one escrow instance.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct InstanceId(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] [u8; 32]);

impl InstanceId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The vault bound 1:1 to this instance.
    pub fn vault(&self) -> VaultId {
        let digest: [u8; 32] = Sha256::new()
            .chain_update(VAULT_DOMAIN)
            .chain_update(self.0)
            .finalize()
            .into();
        VaultId(digest)
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl std::str::FromStr for InstanceId {
    type Err = IdentityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim()).into_vec()?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(len))?;
        Ok(Self(arr))
    }
}

/// Identifier of the custody vault owned by an instance.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct VaultId(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] [u8; 32]);

impl std::fmt::Display for VaultId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

/// Hash the five-tuple with an explicit nonce. Does not check validity.
pub fn derive(tag: &[u8], asset: &AssetId, parties: &Parties, nonce: u8) -> [u8; 32] {
    Sha256::new()
        .chain_update(tag)
        .chain_update(asset)
        .chain_update(parties.sender)
        .chain_update(parties.intermediary)
        .chain_update(parties.receiver)
        .chain_update(parties.arbitrator)
        .chain_update([nonce])
        .chain_update(INSTANCE_DOMAIN)
        .finalize()
        .into()
}

/// Whether `candidate` is usable as an instance id (off the Ed25519 curve).
pub fn is_valid_id(candidate: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(candidate).is_err()
}

/// Derive the canonical id and nonce for a five-tuple.
///
/// # Errors
///
/// Returns [`EscrowError::AddressExhausted`] if every nonce lands on the
/// curve.
pub fn find_instance_id(
    tag: &[u8],
    asset: &AssetId,
    parties: &Parties,
) -> Result<(InstanceId, u8)> {
    for nonce in 0..=u8::MAX {
        let candidate = derive(tag, asset, parties, nonce);
        if is_valid_id(&candidate) {
            trace!(nonce, "found canonical nonce");
            return Ok((InstanceId(candidate), nonce));
        }
    }
    Err(EscrowError::AddressExhausted)
}

/// Re-derive from stored fields and compare against `expected`.
///
/// # Errors
///
/// Returns [`EscrowError::AddressMismatch`] if the stored fields do not
/// derive to `expected` or the derived digest is not a valid id.
pub fn verify_instance_id(
    expected: &InstanceId,
    tag: &[u8],
    asset: &AssetId,
    parties: &Parties,
    nonce: u8,
) -> Result<()> {
    let derived = derive(tag, asset, parties, nonce);
    let matches = derived.as_slice().ct_eq(expected.as_bytes()).unwrap_u8() == 1;
    if matches && is_valid_id(&derived) {
        Ok(())
    } else {
        Err(EscrowError::AddressMismatch(expected.to_string()))
    }
}
