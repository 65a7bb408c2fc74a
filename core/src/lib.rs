//! Three-party escrow with deadline refunds and arbitrated disputes.
//!
//! A sender locks a fixed amount of a fungible asset in a vault. The
//! intermediary and the receiver both confirm before the intermediary
//! can collect; the sender may reclaim an unconfirmed escrow after the
//! deadline; any party may raise a dispute that only the arbitrator
//! can settle.

/// Deterministic instance and vault ids
pub mod address;
/// Fungible asset identifiers and amounts
pub mod asset;
/// Caller authentication and role gates
pub mod auth;
/// Id-keyed store applying transitions atomically
pub mod book;
pub mod clock;
pub mod custody;
pub mod engine;
pub mod error;
/// Escrow record and status machine
pub mod escrow;
pub mod event;
/// Data representations of parties
pub mod identity;
#[cfg(feature = "json")]
pub mod interface;

pub use address::{InstanceId, VaultId};
pub use asset::AssetId;
pub use auth::{Authenticator, Caller, Credential, Ed25519Authenticator};
pub use book::EscrowBook;
pub use clock::{Clock, FixedClock, SystemClock};
pub use custody::{Custody, Ledger};
pub use engine::InitRequest;
pub use error::EscrowError;
pub use escrow::{EscrowRecord, EscrowStatus, Resolution, Role};
pub use event::EscrowEvent;
pub use identity::{Identity, Parties, Party};
#[cfg(feature = "json")]
pub use interface::{EscrowMetadata, EscrowParams};

pub type Result<T> = std::result::Result<T, EscrowError>;
