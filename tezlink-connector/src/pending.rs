//! # Pending Requests
//!
//! A [`PendingRequest`] is the caller's side of an in-flight wallet request. It is
//! cloneable and every clone observes the same single outcome: the first result
//! delivered wins and later ones are discarded.

use crate::{
    error::RequestError,
    types::{OperationRecord, RequestId, RequestKind, SignResult, WalletSession},
};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::{fmt, future::IntoFuture, marker::PhantomData, time::Duration};
use tokio::{sync::oneshot, time::Instant};

/// The untyped value a request resolves with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Session(WalletSession),
    /// Whether a live session was actually torn down.
    Disconnected(bool),
    Operation(OperationRecord),
    Signed(SignResult),
}

pub type Outcome = Result<Resolution, RequestError>;
pub(crate) type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;
pub(crate) type OutcomeSender = oneshot::Sender<Outcome>;

/// Converts a [`Resolution`] into the value a typed handle yields.
pub trait FromResolution: Sized {
    fn from_resolution(resolution: Resolution) -> Option<Self>;
}

impl FromResolution for WalletSession {
    fn from_resolution(resolution: Resolution) -> Option<Self> {
        match resolution {
            Resolution::Session(session) => Some(session),
            _ => None,
        }
    }
}

impl FromResolution for bool {
    fn from_resolution(resolution: Resolution) -> Option<Self> {
        match resolution {
            Resolution::Disconnected(done) => Some(done),
            _ => None,
        }
    }
}

impl FromResolution for OperationRecord {
    fn from_resolution(resolution: Resolution) -> Option<Self> {
        match resolution {
            Resolution::Operation(record) => Some(record),
            _ => None,
        }
    }
}

impl FromResolution for SignResult {
    fn from_resolution(resolution: Resolution) -> Option<Self> {
        match resolution {
            Resolution::Signed(result) => Some(result),
            _ => None,
        }
    }
}

/// Originations settle once injected; the record itself is broadcast as a notification.
impl FromResolution for () {
    fn from_resolution(resolution: Resolution) -> Option<Self> {
        match resolution {
            Resolution::Operation(_) => Some(()),
            _ => None,
        }
    }
}

/// Creates the sending half and the shared receiving half of a request outcome.
///
/// If the sender is dropped without a result, the outcome is [`RequestError::SessionLost`].
pub(crate) fn outcome_channel() -> (OutcomeSender, SharedOutcome) {
    let (tx, rx) = oneshot::channel();
    let outcome = rx
        .map(|received| received.unwrap_or(Err(RequestError::SessionLost)))
        .boxed()
        .shared();
    (tx, outcome)
}

/// A handle to an in-flight (or already settled) wallet request.
///
/// Await it to obtain the result.
pub struct PendingRequest<T> {
    id: RequestId,
    kind: RequestKind,
    created_at: Instant,
    timeout: Duration,
    outcome: SharedOutcome,
    _result: PhantomData<fn() -> T>,
}

impl<T> PendingRequest<T> {
    pub(crate) fn new(
        id: RequestId,
        kind: RequestKind,
        created_at: Instant,
        timeout: Duration,
        outcome: SharedOutcome,
    ) -> Self {
        Self {
            id,
            kind,
            created_at,
            timeout,
            outcome,
            _result: PhantomData,
        }
    }

    /// A handle that is already resolved with `resolution`.
    pub(crate) fn ready(id: RequestId, kind: RequestKind, resolution: Outcome) -> Self {
        let (tx, outcome) = outcome_channel();
        let _ = tx.send(resolution);
        Self::new(id, kind, Instant::now(), Duration::ZERO, outcome)
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The deadline this request was registered with. Zero for handles that were
    /// resolved on creation.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<T> Clone for PendingRequest<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            created_at: self.created_at,
            timeout: self.timeout,
            outcome: self.outcome.clone(),
            _result: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PendingRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<T> IntoFuture for PendingRequest<T>
where
    T: FromResolution + Send + 'static,
{
    type Output = Result<T, RequestError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let kind = self.kind;
        async move {
            let resolution = self.outcome.await?;
            T::from_resolution(resolution).ok_or_else(|| RequestError::Unknown {
                message: format!("unexpected result for {kind} request"),
            })
        }
        .boxed()
    }
}
