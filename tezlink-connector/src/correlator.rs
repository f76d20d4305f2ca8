//! # Request Correlator
//!
//! Wallets answer asynchronously and without echoing any request id, so the
//! correlator keys outstanding requests by [`RequestKind`] alone. It keeps at most one
//! slot per kind; registering a kind that is already pending hands back the existing
//! handle instead of creating a second one.
//!
//! The correlator is owned by the manager task and never shared, so it needs no locking.

use crate::{
    error::RequestError,
    pending::{outcome_channel, Outcome, OutcomeSender, PendingRequest, SharedOutcome},
    types::{OperationKind, RequestId, RequestKind},
};
use std::{collections::HashMap, time::Duration};
use tokio::time::Instant;

struct Slot {
    id: RequestId,
    created_at: Instant,
    deadline: Instant,
    timeout: Duration,
    tx: OutcomeSender,
    outcome: SharedOutcome,
}

/// Tracks the single outstanding request of each kind.
pub struct Correlator {
    slots: HashMap<RequestKind, Slot>,
    next_id: RequestId,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Returns a handle to the outstanding request of `kind`, if there is one.
    pub fn pending<T>(&self, kind: RequestKind) -> Option<PendingRequest<T>> {
        self.slots.get(&kind).map(|slot| {
            PendingRequest::new(
                slot.id,
                kind,
                slot.created_at,
                slot.timeout,
                slot.outcome.clone(),
            )
        })
    }

    pub fn is_pending(&self, kind: RequestKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn slot_id(&self, kind: RequestKind) -> Option<RequestId> {
        self.slots.get(&kind).map(|slot| slot.id)
    }

    /// Opens a slot for `kind` that expires after `timeout`.
    ///
    /// If a slot of that kind already exists, its handle is returned unchanged.
    pub fn register<T>(&mut self, kind: RequestKind, timeout: Duration) -> PendingRequest<T> {
        if let Some(existing) = self.pending(kind) {
            return existing;
        }
        let id = self.allocate_id();
        let created_at = Instant::now();
        let (tx, outcome) = outcome_channel();
        let handle = PendingRequest::new(id, kind, created_at, timeout, outcome.clone());
        self.slots.insert(
            kind,
            Slot {
                id,
                created_at,
                deadline: created_at + timeout,
                timeout,
                tx,
                outcome,
            },
        );
        tracing::debug!(request_id = id, %kind, ?timeout, "Request registered.");
        handle
    }

    /// A handle that is already settled with `outcome` and occupies no slot.
    pub fn ready<T>(&mut self, kind: RequestKind, outcome: Outcome) -> PendingRequest<T> {
        let id = self.allocate_id();
        PendingRequest::ready(id, kind, outcome)
    }

    /// Settles the outstanding request of `kind`.
    ///
    /// `outcome` receives the slot's request id. Returns that id, or `None` when nothing
    /// of that kind was pending (the result is then discarded).
    pub fn resolve_with<F>(&mut self, kind: RequestKind, outcome: F) -> Option<RequestId>
    where
        F: FnOnce(RequestId) -> Outcome,
    {
        let slot = self.slots.remove(&kind)?;
        let result = outcome(slot.id);
        match &result {
            Ok(_) => tracing::debug!(request_id = slot.id, %kind, "Request resolved."),
            Err(e) => tracing::debug!(request_id = slot.id, %kind, "Request failed: {}", e),
        }
        let _ = slot.tx.send(result);
        Some(slot.id)
    }

    pub fn resolve(&mut self, kind: RequestKind, outcome: Outcome) -> Option<RequestId> {
        self.resolve_with(kind, |_| outcome)
    }

    /// Fails every outstanding request except `keep` with `error`. Returns how many failed.
    pub fn fail_all_except(&mut self, keep: Option<RequestKind>, error: RequestError) -> usize {
        let kinds: Vec<RequestKind> = self
            .slots
            .keys()
            .copied()
            .filter(|kind| Some(*kind) != keep)
            .collect();
        for kind in &kinds {
            self.resolve(*kind, Err(error.clone()));
        }
        kinds.len()
    }

    pub fn fail_all(&mut self, error: RequestError) -> usize {
        self.fail_all_except(None, error)
    }

    /// Fails every request whose deadline is at or before `now` with a timeout.
    pub fn expire(&mut self, now: Instant) -> Vec<(RequestKind, RequestId)> {
        let due: Vec<RequestKind> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.deadline <= now)
            .map(|(kind, _)| *kind)
            .collect();
        due.into_iter()
            .filter_map(|kind| {
                let after = self.slots.get(&kind)?.timeout;
                self.resolve(kind, Err(RequestError::Timeout { kind, after }))
                    .map(|id| (kind, id))
            })
            .collect()
    }

    /// The earliest deadline among outstanding requests.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.values().map(|slot| slot.deadline).min()
    }

    /// Decides which slot an operation injection belongs to.
    ///
    /// An explicit `hint` wins. Without one, the event goes to the operation slot, or to
    /// the origination slot when that is the only one pending.
    pub fn operation_target(&self, hint: Option<OperationKind>) -> RequestKind {
        if let Some(kind) = hint {
            return kind.into();
        }
        if !self.is_pending(RequestKind::Operation) && self.is_pending(RequestKind::Originate) {
            RequestKind::Originate
        } else {
            RequestKind::Operation
        }
    }

    /// Decides which slot a completion or failure belongs to.
    ///
    /// Unlike [`operation_target`](Self::operation_target) this never guesses an
    /// origination: such events may refer to a contract call settled long ago.
    pub fn settlement_target(&self, hint: Option<OperationKind>) -> RequestKind {
        hint.map(RequestKind::from).unwrap_or(RequestKind::Operation)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
