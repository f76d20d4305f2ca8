//! # Wallet Manager & Background Workers
//!
//! This module defines the `WalletManager`, the single task that owns the wallet session
//! and every outstanding request.
//!
//! ## Core Components
//!
//! - [`WalletManager`]: Owns the session state machine, the request correlator and the
//!   transport. It is consumed when its `run` method is called.
//! - [`WalletHandle`]: A clonable, thread-safe handle that provides the public API
//!   (connect, sign, send operations, subscribe, shut down).
//! - **Workers**:
//!   - `OperationTracker`: Polls an indexer until an injected operation is applied.
//!
//! Commands from handles and normalized wallet events are both funnelled into the manager
//! through bounded channels, so all state changes happen in one place and in arrival order.

mod manager;
pub mod tracker;

pub use manager::WalletManager;

use crate::{
    error::RequestError,
    inbound::InboundSender,
    notifications::{NotificationStream, WalletNotification},
    pending::PendingRequest,
    session::SessionSnapshot,
    types::{ContractCall, OperationRecord, OriginationRequest, SignPayloadRequest, SignResult, WalletSession},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

type Reply<T> = oneshot::Sender<Result<PendingRequest<T>, RequestError>>;

/// Commands accepted by the manager task.
pub(crate) enum Command {
    Connect(Reply<WalletSession>),
    Disconnect(Reply<bool>),
    Operation(ContractCall, Reply<OperationRecord>),
    SignPayload(SignPayloadRequest, Reply<SignResult>),
    Originate(OriginationRequest, Reply<()>),
    Shutdown,
}

/// A clonable, thread-safe handle for interacting with the running [`WalletManager`].
///
/// Every `begin_*` method returns as soon as the request has been handed to the wallet,
/// yielding a [`PendingRequest`] to await. The plain variants await the result directly.
#[derive(Clone)]
pub struct WalletHandle {
    commands: mpsc::Sender<Command>,
    inbound: InboundSender,
    session: watch::Receiver<SessionSnapshot>,
    notifications: broadcast::Sender<WalletNotification>,
}

impl WalletHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<PendingRequest<T>, RequestError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| RequestError::SessionLost)?;
        reply_rx.await.map_err(|_| RequestError::SessionLost)?
    }

    /// Starts pairing, or returns the current session if a wallet is already connected.
    ///
    /// Calling this again while pairing returns the same pending request.
    pub async fn begin_connect(&self) -> Result<PendingRequest<WalletSession>, RequestError> {
        self.request(Command::Connect).await
    }

    pub async fn connect(&self) -> Result<WalletSession, RequestError> {
        self.begin_connect().await?.await
    }

    /// Ends the session. Resolves to `false` when there was nothing to disconnect.
    pub async fn begin_disconnect(&self) -> Result<PendingRequest<bool>, RequestError> {
        self.request(Command::Disconnect).await
    }

    pub async fn disconnect(&self) -> Result<bool, RequestError> {
        self.begin_disconnect().await?.await
    }

    pub async fn begin_operation(
        &self,
        call: ContractCall,
    ) -> Result<PendingRequest<OperationRecord>, RequestError> {
        self.request(|reply| Command::Operation(call, reply)).await
    }

    /// Sends a contract call and waits for the wallet to inject it.
    pub async fn request_operation(&self, call: ContractCall) -> Result<OperationRecord, RequestError> {
        self.begin_operation(call).await?.await
    }

    pub async fn begin_sign_payload(
        &self,
        request: SignPayloadRequest,
    ) -> Result<PendingRequest<SignResult>, RequestError> {
        self.request(|reply| Command::SignPayload(request, reply)).await
    }

    pub async fn request_sign_payload(
        &self,
        request: SignPayloadRequest,
    ) -> Result<SignResult, RequestError> {
        self.begin_sign_payload(request).await?.await
    }

    /// Deploys a contract. The injected operation is reported through
    /// [`WalletNotification::OperationInjected`].
    pub async fn begin_originate(
        &self,
        request: OriginationRequest,
    ) -> Result<PendingRequest<()>, RequestError> {
        self.request(|reply| Command::Originate(request, reply)).await
    }

    pub async fn request_originate(&self, request: OriginationRequest) -> Result<(), RequestError> {
        self.begin_originate(request).await?.await
    }

    /// The latest published session state.
    pub fn session(&self) -> SessionSnapshot {
        self.session.borrow().clone()
    }

    /// A receiver that is notified whenever the session changes.
    pub fn watch_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.clone()
    }

    /// The sink host code feeds raw wallet messages into.
    pub fn inbound(&self) -> InboundSender {
        self.inbound.clone()
    }

    pub fn subscribe(&self) -> NotificationStream {
        NotificationStream::new(self.notifications.subscribe())
    }

    /// Stops the manager. Outstanding requests fail with `SessionLost`.
    pub async fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).await.is_err() {
            tracing::warn!("Failed to send shutdown to wallet manager: it may already be down");
        }
    }
}
