//! Core types for JSON (de)serialization of escrow parameters and metadata.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::address::{InstanceId, VaultId, DEFAULT_TAG};
use crate::asset::AssetId;
use crate::auth::Caller;
use crate::book::EscrowBook;
use crate::clock::Clock;
use crate::custody::Custody;
use crate::engine::InitRequest;
use crate::escrow::{EscrowRecord, EscrowStatus};
use crate::event::EscrowEvent;
use crate::identity::{Identity, Parties};
use crate::{EscrowError, Result};

/// Reads a JSON-encoded file from the given `path` and deserializes into type `T`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be opened, read, or parsed.
pub fn load_escrow_data<P, T>(path: P) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("loading escrow data: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing JSON from {:?}", path))
}

/// Writes `data` (serializable) as pretty-printed JSON to the given `path`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be created or data cannot be serialized.
pub fn save_escrow_data<P, T>(path: P, data: &T) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating file {:?}", path))?;
    serde_json::to_writer_pretty(file, data)
        .with_context(|| format!("serializing to JSON to {:?}", path))
}

fn default_tag() -> String {
    String::from_utf8_lossy(DEFAULT_TAG).into_owned()
}

/// Parameters required to **create** an escrow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowParams {
    /// Addressing tag; defaults to `"escrow"`.
    #[serde(default = "default_tag")]
    pub tag: String,

    /// The asset to lock.
    pub asset: AssetId,

    /// Who funds the escrow. Must match the authenticated caller.
    pub sender: Identity,

    /// Paid on normal settlement; must confirm.
    pub intermediary: Identity,

    /// Must confirm before release.
    pub receiver: Identity,

    /// Settles disputes.
    pub arbitrator: Identity,

    /// Units to lock, in the asset's smallest unit.
    pub amount: u64,

    /// Unix timestamp after which the sender may cancel an unconfirmed escrow.
    pub deadline: i64,
}

impl EscrowParams {
    /// Build the Initialize arguments on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Unauthorized`] if `caller` is not the
    /// sender named in the params.
    pub fn to_request(&self, caller: &Caller) -> Result<InitRequest> {
        if caller.identity() != &self.sender {
            return Err(EscrowError::Unauthorized);
        }
        Ok(InitRequest {
            asset: self.asset,
            intermediary: self.intermediary,
            receiver: self.receiver,
            arbitrator: self.arbitrator,
            amount: self.amount,
            deadline: self.deadline,
        })
    }

    /// Create the escrow these params describe in `book`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::TagMismatch`] if `book` derives ids under a
    /// different tag, otherwise whatever [`Self::to_request`] or
    /// [`EscrowBook::initialize`] reject.
    pub fn initialize<C: Custody, K: Clock>(
        &self,
        book: &mut EscrowBook<C, K>,
        caller: &Caller,
    ) -> Result<EscrowEvent> {
        if book.tag() != self.tag.as_bytes() {
            return Err(EscrowError::TagMismatch(self.tag.clone()));
        }
        let req = self.to_request(caller)?;
        book.initialize(caller, &req)
    }
}

/// Metadata **returned** from escrow creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowMetadata {
    pub id: InstanceId,
    pub vault: VaultId,
    /// Canonical addressing nonce.
    pub nonce: u8,
    pub asset: AssetId,
    pub parties: Parties,
    pub amount: u64,
    pub deadline: i64,
    /// Where in the lifecycle the escrow currently is.
    pub status: EscrowStatus,
}

impl EscrowMetadata {
    pub fn new(id: InstanceId, record: &EscrowRecord) -> Self {
        Self {
            id,
            vault: id.vault(),
            nonce: record.nonce,
            asset: record.asset,
            parties: record.parties,
            amount: record.amount,
            deadline: record.deadline,
            status: record.status(),
        }
    }
}
