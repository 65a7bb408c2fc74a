//! Pure transition functions.
//!
//! Each operation maps `(current record, caller, now)` to a
//! [`Transition`] or an error, without touching custody. Applying the
//! transition (moving funds, storing the record) is left to
//! [`EscrowBook`](crate::book::EscrowBook).
//!
//! Checks run in a fixed order: caller role, instance address, then
//! status, flags and time.

use crate::address::{self, InstanceId};
use crate::asset::{self, AssetId};
use crate::auth::{require_any_party, require_party, Caller};
use crate::escrow::{EscrowRecord, EscrowStatus, Resolution, Role, Settlement};
use crate::event::EscrowEvent;
use crate::identity::{Identity, Parties, Party};
use crate::{EscrowError, Result};

/// Arguments to Initialize. The sender is the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub asset: AssetId,
    pub intermediary: Identity,
    pub receiver: Identity,
    pub arbitrator: Identity,
    pub amount: u64,
    /// Unix timestamp (seconds).
    pub deadline: i64,
}

/// Funds a transition moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Fund the vault from `source`.
    Deposit { source: Identity, amount: u64 },
    /// Drain the vault into `destination` and close it.
    Payout { destination: Identity, amount: u64 },
}

/// The validated outcome of an operation, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: InstanceId,
    pub record: EscrowRecord,
    pub movement: Option<Movement>,
    pub event: EscrowEvent,
}

fn ensure(cond: bool, err: EscrowError) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(err)
    }
}

/// Create a new record funded by `caller`.
pub fn initialize(tag: &[u8], caller: &Caller, req: &InitRequest, now: i64) -> Result<Transition> {
    let amount = asset::validate_amount(req.amount)?;
    ensure(
        req.deadline > now,
        EscrowError::InvalidDeadline {
            deadline: req.deadline,
            now,
        },
    )?;

    let parties = Parties {
        sender: *caller.identity(),
        intermediary: req.intermediary,
        receiver: req.receiver,
        arbitrator: req.arbitrator,
    };
    let (id, nonce) = address::find_instance_id(tag, &req.asset, &parties)?;
    let record = EscrowRecord::new(tag, nonce, req.asset, parties, amount, req.deadline);

    Ok(Transition {
        id,
        movement: Some(Movement::Deposit {
            source: parties.sender,
            amount,
        }),
        event: EscrowEvent::Initialized {
            id,
            vault: id.vault(),
            asset: req.asset,
            parties,
            amount,
            deadline: req.deadline,
        },
        record,
    })
}

/// Record `role`'s confirmation.
pub fn confirm(
    id: &InstanceId,
    current: &EscrowRecord,
    caller: &Caller,
    role: Role,
    now: i64,
) -> Result<Transition> {
    require_party(current, caller, role.into())?;
    current.verify_address(id)?;
    ensure(
        matches!(current.status(), EscrowStatus::Pending | EscrowStatus::Confirmed),
        EscrowError::InvalidEscrowState,
    )?;
    ensure(!current.confirmed(role), EscrowError::InvalidEscrowState)?;

    let mut record = current.clone();
    record.set_confirmed(role, true);
    Ok(Transition {
        id: *id,
        record,
        movement: None,
        event: EscrowEvent::Confirmed {
            id: *id,
            role,
            timestamp: now,
        },
    })
}

/// Withdraw `role`'s confirmation before the deadline.
pub fn revoke(
    id: &InstanceId,
    current: &EscrowRecord,
    caller: &Caller,
    role: Role,
    now: i64,
) -> Result<Transition> {
    require_party(current, caller, role.into())?;
    current.verify_address(id)?;
    ensure(
        matches!(current.status(), EscrowStatus::Pending | EscrowStatus::Confirmed),
        EscrowError::InvalidEscrowState,
    )?;
    ensure(current.confirmed(role), EscrowError::NotConfirmed)?;
    ensure(now < current.deadline, EscrowError::RevocationPeriodExpired)?;

    let mut record = current.clone();
    record.set_confirmed(role, false);
    Ok(Transition {
        id: *id,
        record,
        movement: None,
        event: EscrowEvent::Revoked {
            id: *id,
            role,
            timestamp: now,
        },
    })
}

/// Freeze the escrow pending arbitration. Open to all four parties.
pub fn dispute(
    id: &InstanceId,
    current: &EscrowRecord,
    caller: &Caller,
    now: i64,
) -> Result<Transition> {
    require_any_party(current, caller)?;
    current.verify_address(id)?;
    ensure(
        matches!(current.status(), EscrowStatus::Pending | EscrowStatus::Confirmed),
        EscrowError::InvalidEscrowState,
    )?;

    let mut record = current.clone();
    record.disputed = true;
    Ok(Transition {
        id: *id,
        record,
        movement: None,
        event: EscrowEvent::Disputed {
            id: *id,
            initiator: *caller.identity(),
            timestamp: now,
        },
    })
}

/// Arbitrator settles a disputed escrow either way.
pub fn resolve_dispute(
    id: &InstanceId,
    current: &EscrowRecord,
    caller: &Caller,
    resolution: Resolution,
    now: i64,
) -> Result<Transition> {
    require_party(current, caller, Party::Arbitrator)?;
    current.verify_address(id)?;
    ensure(
        current.status() == EscrowStatus::Disputed,
        EscrowError::InvalidEscrowState,
    )?;

    let destination = match resolution {
        Resolution::Release => current.parties.intermediary,
        Resolution::Cancel => current.parties.sender,
    };
    Ok(Transition {
        id: *id,
        record: settle(current, resolution.into()),
        movement: Some(Movement::Payout {
            destination,
            amount: current.amount,
        }),
        event: EscrowEvent::DisputeResolved {
            id: *id,
            resolution,
            timestamp: now,
        },
    })
}

/// Intermediary collects a fully confirmed escrow.
pub fn release(
    id: &InstanceId,
    current: &EscrowRecord,
    caller: &Caller,
    now: i64,
) -> Result<Transition> {
    require_party(current, caller, Party::Intermediary)?;
    current.verify_address(id)?;
    ensure(
        current.status() == EscrowStatus::Confirmed,
        EscrowError::InvalidEscrowState,
    )?;

    Ok(Transition {
        id: *id,
        record: settle(current, Settlement::Released),
        movement: Some(Movement::Payout {
            destination: current.parties.intermediary,
            amount: current.amount,
        }),
        event: EscrowEvent::Released {
            id: *id,
            amount: current.amount,
            timestamp: now,
        },
    })
}

/// Sender reclaims an unconfirmed escrow once the deadline has passed.
pub fn cancel(
    id: &InstanceId,
    current: &EscrowRecord,
    caller: &Caller,
    now: i64,
) -> Result<Transition> {
    require_party(current, caller, Party::Sender)?;
    current.verify_address(id)?;
    ensure(
        current.status() == EscrowStatus::Pending,
        EscrowError::InvalidEscrowState,
    )?;
    ensure(now >= current.deadline, EscrowError::InvalidEscrowState)?;

    Ok(Transition {
        id: *id,
        record: settle(current, Settlement::Cancelled),
        movement: Some(Movement::Payout {
            destination: current.parties.sender,
            amount: current.amount,
        }),
        event: EscrowEvent::Cancelled {
            id: *id,
            amount: current.amount,
            timestamp: now,
        },
    })
}

fn settle(current: &EscrowRecord, settlement: Settlement) -> EscrowRecord {
    let mut record = current.clone();
    record.settlement = Some(settlement);
    record
}
