//! Caller authentication and per-transition role gates.
//!
//! The engine never takes a bare [`Identity`] as a caller. Callers are
//! obtained through an [`Authenticator`], which proves the claimant
//! controls the identity. Role gates then compare that proven identity
//! against the party the transition requires.

use ed25519_dalek::{Signature, Verifier};
use tracing::debug;

use crate::error::AuthError;
use crate::escrow::EscrowRecord;
use crate::identity::{Identity, Party};
use crate::{EscrowError, Result};

/// A claim that `identity` authorized `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub identity: Identity,
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Credential {
    pub fn new(
        identity: Identity,
        message: impl Into<Vec<u8>>,
        signature: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            identity,
            message: message.into(),
            signature: signature.into(),
        }
    }

    /// Sign `message` with `key`.
    pub fn sign(key: &ed25519_dalek::SigningKey, message: impl Into<Vec<u8>>) -> Self {
        use ed25519_dalek::Signer as _;

        let message = message.into();
        let signature = key.sign(&message).to_bytes().to_vec();
        Self {
            identity: Identity::from(&key.verifying_key()),
            message,
            signature,
        }
    }
}

/// Verifies that a claimant genuinely controls an identity.
pub trait Authenticator {
    /// Return the proven identity, or why the proof failed.
    fn verify(&self, credential: &Credential) -> std::result::Result<Identity, AuthError>;
}

/// Ed25519 signature check over the credential's message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Authenticator;

impl Authenticator for Ed25519Authenticator {
    fn verify(&self, credential: &Credential) -> std::result::Result<Identity, AuthError> {
        let pk = credential.identity.verifying_key()?;
        let sig = Signature::from_slice(&credential.signature)
            .map_err(|_| AuthError::MalformedSignature)?;
        pk.verify(&credential.message, &sig)
            .map_err(|_| AuthError::VerificationFailed)?;
        Ok(credential.identity)
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(Identity);

impl Caller {
    /// Authenticate `credential` and wrap the proven identity.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Auth`] if the authenticator rejects it.
    pub fn authenticate<A: Authenticator + ?Sized>(
        authenticator: &A,
        credential: &Credential,
    ) -> Result<Self> {
        let identity = authenticator.verify(credential)?;
        Ok(Self(identity))
    }

    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

/// Require that `caller` holds `party` in `record`.
///
/// # Errors
///
/// Returns [`EscrowError::Unauthorized`] on mismatch.
pub fn require_party(record: &EscrowRecord, caller: &Caller, party: Party) -> Result<()> {
    if record.party(party) != caller.identity() {
        debug!(%party, caller = %caller.identity(), "caller does not hold required role");
        return Err(EscrowError::Unauthorized);
    }
    Ok(())
}

/// Require that `caller` is one of the four parties; returns the role.
///
/// # Errors
///
/// Returns [`EscrowError::Unauthorized`] for outsiders.
pub fn require_any_party(record: &EscrowRecord, caller: &Caller) -> Result<Party> {
    record.parties.role_of(caller.identity()).ok_or_else(|| {
        debug!(caller = %caller.identity(), "caller is not a party");
        EscrowError::Unauthorized
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use ed25519_dalek::SigningKey;

    use super::*;

    /// Deterministic signing key for `seed`.
    pub fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    pub fn caller(key: &SigningKey) -> Caller {
        let cred = Credential::sign(key, b"triad".to_vec());
        Caller::authenticate(&Ed25519Authenticator, &cred).unwrap()
    }
}
