//! Id-keyed escrow store that commits transitions against custody.
//!
//! Every entry point samples the clock once, validates against the
//! stored record through [`engine`], then applies the custody movement
//! and writes the record. Custody is applied first; if it fails the
//! record is not written, so an error is never partially observable.
//!
//! Operations on the same instance are expected to arrive in a single
//! total order. Racing transitions (say Cancel by the sender and Dispute
//! by another party right at the deadline) are both validated against
//! whatever state is current when each is applied, so the first to
//! commit wins and the other fails with `InvalidEscrowState`.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::address::{InstanceId, DEFAULT_TAG};
use crate::auth::Caller;
use crate::clock::Clock;
use crate::custody::Custody;
use crate::engine::{self, InitRequest, Movement, Transition};
use crate::escrow::{EscrowRecord, Resolution, Role};
use crate::event::EscrowEvent;
use crate::{EscrowError, Result};

/// The set of escrow instances managed against one custody store.
#[derive(Debug)]
pub struct EscrowBook<C, K> {
    tag: Vec<u8>,
    records: HashMap<InstanceId, EscrowRecord>,
    custody: C,
    clock: K,
}

impl<C: Custody, K: Clock> EscrowBook<C, K> {
    /// A book deriving ids under [`DEFAULT_TAG`].
    pub fn new(custody: C, clock: K) -> Self {
        Self::with_tag(DEFAULT_TAG, custody, clock)
    }

    pub fn with_tag(tag: &[u8], custody: C, clock: K) -> Self {
        Self {
            tag: tag.to_vec(),
            records: HashMap::new(),
            custody,
            clock,
        }
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    /// Mutable custody access, e.g. to fund holdings.
    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn record(&self, id: &InstanceId) -> Option<&EscrowRecord> {
        self.records.get(id)
    }

    /// Units currently held in the vault of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotFound`] if no record is stored under `id`.
    pub fn vault_balance(&self, id: &InstanceId) -> Result<u64> {
        self.get(id)?;
        Ok(self.custody.balance(&id.vault()))
    }

    /// Check the custody invariant for `id`.
    pub fn check_invariants(&self, id: &InstanceId) -> Result<()> {
        let record = self.get(id)?;
        record.verify_address(id)?;
        let vault = id.vault();
        record.check_custody(&vault, self.custody.balance(&vault))
    }

    #[instrument(skip_all, fields(sender = %caller.identity(), amount = req.amount))]
    pub fn initialize(&mut self, caller: &Caller, req: &InitRequest) -> Result<EscrowEvent> {
        let now = self.clock.now();
        let transition = engine::initialize(&self.tag, caller, req, now).inspect_err(rejected)?;
        if self.records.contains_key(&transition.id) {
            debug!(id = %transition.id, "instance already exists");
            return Err(EscrowError::AlreadyExists(transition.id.to_string()));
        }
        self.commit(transition)
    }

    #[instrument(skip_all, fields(%id, ?role))]
    pub fn confirm(&mut self, id: &InstanceId, caller: &Caller, role: Role) -> Result<EscrowEvent> {
        let now = self.clock.now();
        let transition =
            engine::confirm(id, self.get(id)?, caller, role, now).inspect_err(rejected)?;
        self.commit(transition)
    }

    #[instrument(skip_all, fields(%id, ?role))]
    pub fn revoke(&mut self, id: &InstanceId, caller: &Caller, role: Role) -> Result<EscrowEvent> {
        let now = self.clock.now();
        let transition =
            engine::revoke(id, self.get(id)?, caller, role, now).inspect_err(rejected)?;
        self.commit(transition)
    }

    #[instrument(skip_all, fields(%id))]
    pub fn dispute(&mut self, id: &InstanceId, caller: &Caller) -> Result<EscrowEvent> {
        let now = self.clock.now();
        let transition = engine::dispute(id, self.get(id)?, caller, now).inspect_err(rejected)?;
        self.commit(transition)
    }

    #[instrument(skip_all, fields(%id, ?resolution))]
    pub fn resolve_dispute(
        &mut self,
        id: &InstanceId,
        caller: &Caller,
        resolution: Resolution,
    ) -> Result<EscrowEvent> {
        let now = self.clock.now();
        let transition = engine::resolve_dispute(id, self.get(id)?, caller, resolution, now)
            .inspect_err(rejected)?;
        self.commit(transition)
    }

    #[instrument(skip_all, fields(%id))]
    pub fn release(&mut self, id: &InstanceId, caller: &Caller) -> Result<EscrowEvent> {
        let now = self.clock.now();
        let transition = engine::release(id, self.get(id)?, caller, now).inspect_err(rejected)?;
        self.commit(transition)
    }

    #[instrument(skip_all, fields(%id))]
    pub fn cancel(&mut self, id: &InstanceId, caller: &Caller) -> Result<EscrowEvent> {
        let now = self.clock.now();
        let transition = engine::cancel(id, self.get(id)?, caller, now).inspect_err(rejected)?;
        self.commit(transition)
    }

    fn get(&self, id: &InstanceId) -> Result<&EscrowRecord> {
        self.records
            .get(id)
            .ok_or_else(|| EscrowError::NotFound(id.to_string()))
    }

    fn commit(&mut self, transition: Transition) -> Result<EscrowEvent> {
        let Transition {
            id,
            record,
            movement,
            event,
        } = transition;
        let vault = id.vault();

        match movement {
            Some(Movement::Deposit { source, amount }) => {
                self.custody
                    .deposit(&source, &record.asset, &vault, amount)
                    .inspect_err(|e| debug!(error = %e, "deposit failed"))?;
            }
            Some(Movement::Payout {
                destination,
                amount,
            }) => {
                self.custody
                    .payout(&vault, &destination, amount)
                    .inspect_err(|e| debug!(error = %e, "payout failed"))?;
            }
            None => {}
        }

        info!(event = event.kind(), status = %record.status(), "transition committed");
        self.records.insert(id, record);
        Ok(event)
    }
}

fn rejected(err: &EscrowError) {
    debug!(error = %err, "transition rejected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetId;
    use crate::auth::testing::{caller, key};
    use crate::clock::FixedClock;
    use crate::custody::Ledger;
    use crate::escrow::EscrowStatus;

    const MINT: AssetId = AssetId::new([9; 32]);
    const NOW: i64 = 1_700_000_000;

    fn book() -> EscrowBook<Ledger, FixedClock> {
        let mut ledger = Ledger::new();
        ledger
            .credit(caller(&key(1)).identity(), &MINT, 5_000_000)
            .unwrap();
        EscrowBook::new(ledger, FixedClock::new(NOW))
    }

    fn request(amount: u64) -> InitRequest {
        InitRequest {
            asset: MINT,
            intermediary: *caller(&key(2)).identity(),
            receiver: *caller(&key(3)).identity(),
            arbitrator: *caller(&key(4)).identity(),
            amount,
            deadline: NOW + 60,
        }
    }

    #[test]
    fn initialize_funds_vault() {
        let mut book = book();
        let sender = caller(&key(1));
        let event = book.initialize(&sender, &request(1_000_000)).unwrap();
        let id = *event.id();

        assert_eq!(book.vault_balance(&id), Ok(1_000_000));
        assert_eq!(book.custody().holding(sender.identity(), &MINT), 4_000_000);
        assert_eq!(book.record(&id).unwrap().status(), EscrowStatus::Pending);
        assert!(book.check_invariants(&id).is_ok());

        assert_eq!(
            book.initialize(&sender, &request(1)),
            Err(EscrowError::AlreadyExists(id.to_string()))
        );
    }

    #[test]
    fn insufficient_funds_creates_nothing() {
        let mut book = book();
        let sender = caller(&key(1));
        let err = book.initialize(&sender, &request(9_000_000)).unwrap_err();
        assert!(matches!(err, EscrowError::Custody(_)));

        let id = engine::initialize(DEFAULT_TAG, &sender, &request(9_000_000), NOW)
            .unwrap()
            .id;
        assert!(book.record(&id).is_none());
        assert_eq!(
            book.vault_balance(&id),
            Err(EscrowError::NotFound(id.to_string()))
        );
        assert_eq!(book.custody().balance(&id.vault()), 0);
    }

    #[test]
    fn unknown_instance() {
        let mut book = book();
        let sender = caller(&key(1));
        let id = engine::initialize(DEFAULT_TAG, &sender, &request(1), NOW)
            .unwrap()
            .id;
        assert_eq!(
            book.cancel(&id, &sender),
            Err(EscrowError::NotFound(id.to_string()))
        );
    }

    #[test]
    fn funding_after_construction() {
        let mut book = EscrowBook::with_tag(b"payroll", Ledger::new(), FixedClock::new(NOW));
        let sender = caller(&key(1));
        assert!(matches!(
            book.initialize(&sender, &request(10)),
            Err(EscrowError::Custody(_))
        ));

        book.custody_mut()
            .credit(sender.identity(), &MINT, 10)
            .unwrap();
        let id = *book.initialize(&sender, &request(10)).unwrap().id();
        assert_eq!(book.tag(), b"payroll");
        assert_eq!(book.record(&id).unwrap().tag, b"payroll".to_vec());
        assert_eq!(book.vault_balance(&id), Ok(10));

        let default_id = engine::initialize(DEFAULT_TAG, &sender, &request(10), NOW)
            .unwrap()
            .id;
        assert_ne!(id, default_id);
    }

    #[test]
    fn clock_sampled_per_call() {
        let mut book = book();
        let sender = caller(&key(1));
        let receiver = caller(&key(3));
        let id = *book.initialize(&sender, &request(10)).unwrap().id();

        book.confirm(&id, &receiver, Role::Receiver).unwrap();
        book.clock().advance(60);
        assert_eq!(
            book.revoke(&id, &receiver, Role::Receiver),
            Err(EscrowError::RevocationPeriodExpired)
        );
        assert!(book.record(&id).unwrap().receiver_confirmed);
    }
}
