//! # Inbound Event Sink
//!
//! Host code may receive wallet messages on any thread. [`InboundSender`] accepts them
//! without blocking, normalizes them with the active transport's [`EventNormalizer`]
//! and enqueues the resulting envelopes for the manager task, which is the only place
//! they are ever applied.

use crate::{error::NormalizeError, events::EventEnvelope};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Turns one raw transport message into an event envelope.
///
/// `Ok(None)` means the message was recognised but carries nothing to act on.
pub trait EventNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> Result<Option<EventEnvelope>, NormalizeError>;
}

/// The thread-safe entry point for raw wallet messages.
#[derive(Clone)]
pub struct InboundSender {
    tx: mpsc::Sender<EventEnvelope>,
    normalizer: Arc<dyn EventNormalizer>,
}

impl InboundSender {
    pub(crate) fn new(tx: mpsc::Sender<EventEnvelope>, normalizer: Arc<dyn EventNormalizer>) -> Self {
        Self { tx, normalizer }
    }

    /// Normalizes and enqueues a raw message. Returns whether an envelope was enqueued.
    ///
    /// Malformed or unknown messages are logged and dropped; they never fail a request.
    pub fn deliver(&self, raw: &str) -> bool {
        match self.normalizer.normalize(raw) {
            Ok(Some(envelope)) => self.send_envelope(envelope),
            Ok(None) => {
                tracing::debug!("Inbound message carries no event; ignored.");
                false
            }
            Err(e) => {
                tracing::warn!("Dropping inbound wallet message: {}", e);
                false
            }
        }
    }

    /// Enqueues an envelope that is already normalized.
    pub fn send_envelope(&self, envelope: EventEnvelope) -> bool {
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(TrySendError::Full(envelope)) => {
                tracing::warn!(event_type = %envelope.event_type, "Inbound queue full; event dropped.");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Wallet manager is gone; inbound event dropped.");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
