//! # Wallet Notifications
//!
//! Subscribers receive a [`WalletNotification`] for every observable change: pairing
//! prompts, session changes and operation progress. Notifications are broadcast, so a
//! slow subscriber that falls behind skips ahead rather than stalling the manager.

use crate::types::{OperationRecord, SignResult, WalletSession};
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletNotification {
    /// The wallet must scan or open this URI to complete pairing.
    PairingRequested { pairing_uri: String },
    Connected(WalletSession),
    Disconnected,
    OperationInjected(OperationRecord),
    OperationConfirmed(OperationRecord),
    OperationFailed(OperationRecord),
    PayloadSigned(SignResult),
    SdkInitialized,
}

/// A subscription to the manager's notifications.
pub struct NotificationStream {
    inner: BroadcastStream<WalletNotification>,
}

impl NotificationStream {
    pub(crate) fn new(rx: broadcast::Receiver<WalletNotification>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
        }
    }

    /// Receives the next notification.
    ///
    /// Returns `None` only after the manager and every [`WalletHandle`](crate::WalletHandle)
    /// are dropped; a running handle keeps the stream open across a manager shutdown.
    pub async fn next(&mut self) -> Option<WalletNotification> {
        loop {
            match self.inner.next().await? {
                Ok(notification) => return Some(notification),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification subscriber lagged behind.");
                }
            }
        }
    }
}
