use crate::{config::Tracker, status::StatusSource};
use dashmap::{mapref::entry::Entry, DashMap};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    task::JoinHandle,
    time::{sleep, Instant},
};

pub const STATUS_CHECK_FAILED: &str = "Error checking operation status";
pub const TRACKING_TIMED_OUT: &str = "Operation tracking timed out";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("operation {0} is already being tracked")]
    AlreadyTracking(String),
}

/// The single, final result of tracking one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingOutcome {
    pub transaction_hash: String,
    pub success: bool,
    pub error_message: Option<String>,
}

impl TrackingOutcome {
    fn confirmed(transaction_hash: &str) -> Self {
        Self {
            transaction_hash: transaction_hash.to_string(),
            success: true,
            error_message: None,
        }
    }

    fn failed(transaction_hash: &str, message: &str) -> Self {
        Self {
            transaction_hash: transaction_hash.to_string(),
            success: false,
            error_message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackedOperation {
    pub transaction_hash: String,
    pub start_time: Instant,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Polls a [`StatusSource`] until an injected operation is applied or the tracking
/// window closes.
///
/// Each hash is tracked by at most one task at a time.
#[derive(Clone)]
pub struct OperationTracker {
    source: Arc<dyn StatusSource>,
    timeout: Duration,
    poll_interval: Duration,
    active: Arc<DashMap<String, TrackedOperation>>,
}

impl OperationTracker {
    pub fn new(source: Arc<dyn StatusSource>, config: &Tracker) -> Self {
        Self::with_timing(source, config.timeout(), config.poll_interval())
    }

    pub fn with_timing(
        source: Arc<dyn StatusSource>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            timeout,
            poll_interval,
            active: Arc::new(DashMap::new()),
        }
    }

    pub fn is_tracking(&self, transaction_hash: &str) -> bool {
        self.active.contains_key(transaction_hash)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Starts tracking `transaction_hash` on a background task.
    ///
    /// `on_complete` runs exactly once with the outcome, after the hash has been released.
    pub fn begin_tracking<F>(
        &self,
        transaction_hash: impl Into<String>,
        on_complete: F,
    ) -> Result<JoinHandle<()>, TrackerError>
    where
        F: FnOnce(TrackingOutcome) + Send + 'static,
    {
        let transaction_hash = transaction_hash.into();
        let operation = TrackedOperation {
            transaction_hash: transaction_hash.clone(),
            start_time: Instant::now(),
            timeout: self.timeout,
            poll_interval: self.poll_interval,
        };
        match self.active.entry(transaction_hash.clone()) {
            Entry::Occupied(_) => return Err(TrackerError::AlreadyTracking(transaction_hash)),
            Entry::Vacant(slot) => {
                slot.insert(operation.clone());
            }
        }

        tracing::info!(hash = %transaction_hash, timeout = ?operation.timeout, "Tracking operation.");
        let source = self.source.clone();
        let active = self.active.clone();
        Ok(tokio::spawn(async move {
            let outcome = poll_until_settled(source.as_ref(), &operation).await;
            active.remove(&operation.transaction_hash);
            if outcome.success {
                tracing::info!(hash = %outcome.transaction_hash, "Operation confirmed.");
            } else {
                tracing::warn!(
                    hash = %outcome.transaction_hash,
                    reason = outcome.error_message.as_deref().unwrap_or(""),
                    "Operation not confirmed."
                );
            }
            on_complete(outcome);
        }))
    }
}

async fn poll_until_settled(source: &dyn StatusSource, op: &TrackedOperation) -> TrackingOutcome {
    let hash = op.transaction_hash.as_str();
    while op.start_time.elapsed() < op.timeout {
        match source.operation_status(hash).await {
            Ok(Some(true)) => return TrackingOutcome::confirmed(hash),
            Ok(Some(false)) => tracing::debug!(hash, "Operation not applied yet."),
            Ok(None) => {
                tracing::warn!(hash, "Indexer returned no status for operation.");
                return TrackingOutcome::failed(hash, STATUS_CHECK_FAILED);
            }
            Err(e) => {
                tracing::warn!(hash, "Status check failed: {}", e);
                return TrackingOutcome::failed(hash, STATUS_CHECK_FAILED);
            }
        }
        sleep(op.poll_interval).await;
    }
    TrackingOutcome::failed(hash, TRACKING_TIMED_OUT)
}
