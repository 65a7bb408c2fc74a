//! Payloads emitted by committed transitions.

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::address::{InstanceId, VaultId};
use crate::asset::AssetId;
use crate::escrow::{Resolution, Role};
use crate::identity::{Identity, Parties};

#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "event", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscrowEvent {
    Initialized {
        id: InstanceId,
        vault: VaultId,
        asset: AssetId,
        parties: Parties,
        amount: u64,
        deadline: i64,
    },
    Confirmed {
        id: InstanceId,
        role: Role,
        timestamp: i64,
    },
    Revoked {
        id: InstanceId,
        role: Role,
        timestamp: i64,
    },
    Disputed {
        id: InstanceId,
        initiator: Identity,
        timestamp: i64,
    },
    DisputeResolved {
        id: InstanceId,
        resolution: Resolution,
        timestamp: i64,
    },
    Released {
        id: InstanceId,
        amount: u64,
        timestamp: i64,
    },
    Cancelled {
        id: InstanceId,
        amount: u64,
        timestamp: i64,
    },
}

impl EscrowEvent {
    pub fn id(&self) -> &InstanceId {
        match self {
            Self::Initialized { id, .. }
            | Self::Confirmed { id, .. }
            | Self::Revoked { id, .. }
            | Self::Disputed { id, .. }
            | Self::DisputeResolved { id, .. }
            | Self::Released { id, .. }
            | Self::Cancelled { id, .. } => id,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::Confirmed { .. } => "confirmed",
            Self::Revoked { .. } => "revoked",
            Self::Disputed { .. } => "disputed",
            Self::DisputeResolved { .. } => "dispute_resolved",
            Self::Released { .. } => "released",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
