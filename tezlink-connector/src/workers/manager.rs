use super::{tracker::OperationTracker, Command, WalletHandle};
use crate::{
    config::WalletConfig,
    correlator::Correlator,
    error::{RequestError, TransportError},
    events::{ErrorInfo, EventEnvelope, OperationData, SignedData, WalletEvent},
    inbound::InboundSender,
    notifications::WalletNotification,
    pending::{FromResolution, PendingRequest, Resolution},
    session::{ConnectionState, SessionMachine, SessionSnapshot},
    storage::{SessionStore, StoredSession},
    transport::{DisconnectMode, WalletInit, WalletTransport},
    types::{
        ActiveAccount, ContractCall, OperationRecord, OriginationRequest, RequestKind,
        SignPayloadRequest, SignResult, WalletSession,
    },
};
use std::{collections::HashMap, sync::Arc};
use tokio::{
    sync::{broadcast, mpsc, watch},
    time::{sleep_until, Instant},
};

/// Upper bound on injected operations remembered for a later wallet confirmation.
const MAX_UNCONFIRMED: usize = 64;

/// A request that reaches the wallet through the transport once a session exists.
enum Outbound {
    ContractCall(ContractCall),
    SignPayload(SignPayloadRequest),
    Originate(OriginationRequest),
}

impl Outbound {
    fn kind(&self) -> RequestKind {
        match self {
            Outbound::ContractCall(_) => RequestKind::Operation,
            Outbound::SignPayload(_) => RequestKind::SignPayload,
            Outbound::Originate(_) => RequestKind::Originate,
        }
    }
}

/// The single owner of the wallet session.
///
/// Created once with [`WalletManager::new`], then its [`run()`](WalletManager::run) method is
/// spawned as a background task, leaving the [`WalletHandle`] as the only way to interact
/// with it.
pub struct WalletManager {
    config: Arc<WalletConfig>,
    transport: Arc<dyn WalletTransport>,
    store: Arc<dyn SessionStore>,
    tracker: Option<OperationTracker>,
    machine: SessionMachine,
    correlator: Correlator,
    /// Injected operations nobody polls for, awaiting a wallet-reported completion.
    unconfirmed: HashMap<String, OperationRecord>,
    commands: mpsc::Receiver<Command>,
    inbound: mpsc::Receiver<EventEnvelope>,
    session_tx: watch::Sender<SessionSnapshot>,
    notifications: broadcast::Sender<WalletNotification>,
}

impl WalletManager {
    /// Creates a new `WalletManager` and its associated [`WalletHandle`].
    ///
    /// Nothing talks to the wallet until [`run()`](WalletManager::run) is called.
    ///
    /// # Arguments
    ///
    /// * `config` - The shared connector configuration.
    /// * `transport` - The transport selected for this platform.
    /// * `store` - Durable storage for the connected session.
    pub fn new(
        config: Arc<WalletConfig>,
        transport: Arc<dyn WalletTransport>,
        store: Arc<dyn SessionStore>,
    ) -> (Self, WalletHandle) {
        // Zero-capacity channels panic in tokio.
        let (command_tx, command_rx) = mpsc::channel(config.channels.command_buffer.max(1));
        let (inbound_tx, inbound_rx) = mpsc::channel(config.channels.inbound_buffer.max(1));
        let (notification_tx, _) =
            broadcast::channel(config.channels.notification_buffer.max(1));

        let machine = SessionMachine::new(transport.kind());
        let (session_tx, session_rx) = watch::channel(machine.snapshot());

        let handle = WalletHandle {
            commands: command_tx,
            inbound: InboundSender::new(inbound_tx, transport.normalizer()),
            session: session_rx,
            notifications: notification_tx.clone(),
        };

        let runner = Self {
            config,
            transport,
            store,
            tracker: None,
            machine,
            correlator: Correlator::new(),
            unconfirmed: HashMap::new(),
            commands: command_rx,
            inbound: inbound_rx,
            session_tx,
            notifications: notification_tx,
        };

        (runner, handle)
    }

    /// Attaches an operation tracker. Injected contract calls are then polled until confirmed.
    pub fn with_tracker(mut self, tracker: OperationTracker) -> Self {
        if self.config.tracker.enabled {
            self.tracker = Some(tracker);
        } else {
            tracing::info!("Operation tracking disabled by configuration.");
        }
        self
    }

    /// Runs the manager until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(connector = %self.transport.kind(), "Wallet manager started.");
        self.bootstrap().await;

        loop {
            let deadline = self.correlator.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        tracing::info!("All wallet handles dropped. Manager shutting down.");
                        break;
                    }
                },
                Some(envelope) = self.inbound.recv() => self.handle_envelope(envelope).await,
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire_requests().await;
                }
            }
        }

        let failed = self.correlator.fail_all(RequestError::SessionLost);
        tracing::info!(failed, "Wallet manager stopped.");
    }

    /// Initializes the transport and restores a previous session if the wallet still holds it.
    async fn bootstrap(&mut self) {
        let init = WalletInit::from_config(&self.config);
        if let Err(e) = self.transport.init(&init).await {
            tracing::warn!("Wallet transport failed to initialize: {}", e);
        }

        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to load persisted session: {}", e);
                None
            }
        };
        let hint = stored
            .as_ref()
            .map(|s| &s.session)
            .filter(|s| s.is_connected && s.connector_kind == self.transport.kind());

        match self.transport.active_account(hint).await {
            Ok(Some(account)) => {
                self.machine.restore(account);
                tracing::info!(address = %self.machine.session().address, "Wallet session restored.");
                self.session_established().await;
            }
            Ok(None) if stored.is_some() => {
                tracing::info!("Persisted session is no longer active; discarding it.");
                self.persist().await;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not query the active account: {}", e),
        }
    }

    /// Returns `true` when the manager should stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect(reply) => {
                let result = self.connect().await;
                let _ = reply.send(result);
            }
            Command::Disconnect(reply) => {
                let result = self.disconnect().await;
                let _ = reply.send(result);
            }
            Command::Operation(call, reply) => {
                let result = self.submit(Outbound::ContractCall(call)).await;
                let _ = reply.send(result);
            }
            Command::SignPayload(request, reply) => {
                let result = self.submit(Outbound::SignPayload(request)).await;
                let _ = reply.send(result);
            }
            Command::Originate(request, reply) => {
                let result = self.submit(Outbound::Originate(request)).await;
                let _ = reply.send(result);
            }
            Command::Shutdown => {
                tracing::info!("Shutdown requested.");
                return true;
            }
        }
        false
    }

    async fn connect(&mut self) -> Result<PendingRequest<WalletSession>, RequestError> {
        match self.machine.state() {
            ConnectionState::Connected => {
                let session = self.machine.session().clone();
                return Ok(self
                    .correlator
                    .ready(RequestKind::Connect, Ok(Resolution::Session(session))));
            }
            ConnectionState::Pairing => {
                if let Some(pending) = self.correlator.pending(RequestKind::Connect) {
                    return Ok(pending);
                }
                self.machine.abort_pairing("pairing request lost");
            }
            ConnectionState::Disconnected => {}
        }

        match self.transport.active_account(None).await {
            Ok(Some(account)) => {
                self.machine.restore(account);
                self.session_established().await;
                let session = self.machine.session().clone();
                return Ok(self
                    .correlator
                    .ready(RequestKind::Connect, Ok(Resolution::Session(session))));
            }
            Ok(None) => {}
            Err(TransportError::Unreachable(reason)) => {
                tracing::warn!(%reason, "Wallet unreachable.");
                return Err(RequestError::NoActiveWallet);
            }
            Err(e) => tracing::warn!("Active account lookup failed, pairing instead: {}", e),
        }

        self.transport.connect_account().await?;
        self.machine.begin_pairing();
        self.publish();
        let timeout = self.config.timeouts.for_kind(RequestKind::Connect);
        Ok(self.correlator.register(RequestKind::Connect, timeout))
    }

    async fn disconnect(&mut self) -> Result<PendingRequest<bool>, RequestError> {
        if let Some(pending) = self.correlator.pending(RequestKind::Disconnect) {
            return Ok(pending);
        }
        if self.machine.state() == ConnectionState::Disconnected {
            return Ok(self
                .correlator
                .ready(RequestKind::Disconnect, Ok(Resolution::Disconnected(false))));
        }

        match self.transport.disconnect_account().await? {
            DisconnectMode::Immediate => {
                self.session_ended("disconnected locally").await;
                Ok(self
                    .correlator
                    .ready(RequestKind::Disconnect, Ok(Resolution::Disconnected(true))))
            }
            DisconnectMode::AwaitEvent => {
                // The local session ends now; the slot only waits for the wallet's echo.
                self.session_ended("disconnect requested").await;
                let timeout = self.config.timeouts.for_kind(RequestKind::Disconnect);
                Ok(self.correlator.register(RequestKind::Disconnect, timeout))
            }
        }
    }

    async fn submit<T>(&mut self, outbound: Outbound) -> Result<PendingRequest<T>, RequestError>
    where
        T: FromResolution,
    {
        let kind = outbound.kind();
        if let Some(pending) = self.correlator.pending(kind) {
            tracing::debug!(%kind, "Request already in flight; reusing it.");
            return Ok(pending);
        }
        if self.machine.state() != ConnectionState::Connected {
            return Err(RequestError::NoActiveWallet);
        }

        match &outbound {
            Outbound::ContractCall(call) => self.transport.send_contract_call(call).await?,
            Outbound::SignPayload(request) => self.transport.sign_payload(request).await?,
            Outbound::Originate(request) => self.transport.originate_contract(request).await?,
        }
        let timeout = self.config.timeouts.for_kind(kind);
        Ok(self.correlator.register(kind, timeout))
    }

    async fn handle_envelope(&mut self, envelope: EventEnvelope) {
        let event = match WalletEvent::from_envelope(&envelope) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event_type = %envelope.event_type, "Dropping malformed wallet event: {}", e);
                return;
            }
        };
        tracing::debug!(event_type = %envelope.event_type, "Wallet event received.");

        match event {
            WalletEvent::PairingRequested { pairing_uri } => {
                if self.machine.set_pairing_uri(pairing_uri.clone()) {
                    self.publish();
                    self.notify(WalletNotification::PairingRequested { pairing_uri });
                } else {
                    tracing::debug!("Pairing URI received while not pairing; ignored.");
                }
            }
            WalletEvent::PairingDone => self.pairing_done().await,
            WalletEvent::Connected(account) => self.wallet_connected(account).await,
            WalletEvent::ConnectionFailed(info) => self.connection_failed(info),
            WalletEvent::Disconnected => {
                self.session_ended("wallet disconnected").await;
                self.correlator
                    .resolve(RequestKind::Disconnect, Ok(Resolution::Disconnected(true)));
            }
            WalletEvent::OperationInjected(data) => self.operation_injected(data),
            WalletEvent::OperationCompleted(data) => self.operation_completed(data),
            WalletEvent::OperationFailed(info) => self.operation_failed(info),
            WalletEvent::PayloadSigned(data) => self.payload_signed(data),
            WalletEvent::PayloadSignFailed(info) => {
                let error = info.classify();
                if self.correlator.resolve(RequestKind::SignPayload, Err(error)).is_none() {
                    tracing::debug!("Late sign failure dropped.");
                }
            }
            WalletEvent::SdkInitialized => {
                tracing::info!("Wallet SDK initialized.");
                self.notify(WalletNotification::SdkInitialized);
            }
        }
    }

    async fn pairing_done(&mut self) {
        if self.machine.state() != ConnectionState::Pairing {
            tracing::debug!("Pairing completion received while not pairing; ignored.");
            return;
        }
        if let Err(e) = self.transport.request_permissions().await {
            tracing::warn!("Permission request failed: {}", e);
            self.machine.abort_pairing("permission request failed");
            self.publish();
            self.correlator.resolve(RequestKind::Connect, Err(e.into()));
        }
    }

    async fn wallet_connected(&mut self, account: ActiveAccount) {
        if self.machine.connected(account).is_none() {
            tracing::debug!("Account event received while disconnected; ignored.");
            return;
        }
        tracing::info!(address = %self.machine.session().address, "Wallet connected.");
        self.session_established().await;
        let session = self.machine.session().clone();
        self.correlator
            .resolve(RequestKind::Connect, Ok(Resolution::Session(session)));
    }

    fn connection_failed(&mut self, info: ErrorInfo) {
        let error = info.classify();
        tracing::warn!("Wallet connection failed: {}", error);
        if self.machine.abort_pairing("connection failed").is_some() {
            self.publish();
        }
        if self.correlator.resolve(RequestKind::Connect, Err(error)).is_none() {
            tracing::debug!("Connection failure without a pending connect; dropped.");
        }
    }

    fn operation_injected(&mut self, data: OperationData) {
        let kind = self.correlator.operation_target(data.kind);
        let hash = data.transaction_hash;
        let mut injected = None;
        self.correlator.resolve_with(kind, |request_id| {
            let record = OperationRecord {
                transaction_hash: hash.clone(),
                request_id,
                kind,
                error_message: None,
            };
            injected = Some(record.clone());
            Ok(Resolution::Operation(record))
        });
        let Some(record) = injected else {
            tracing::debug!(%kind, %hash, "Late operation result dropped.");
            return;
        };

        tracing::info!(%kind, hash = %record.transaction_hash, "Operation injected.");
        self.notify(WalletNotification::OperationInjected(record.clone()));
        let tracked = kind == RequestKind::Operation && self.track(record.clone());
        if tracked {
            return;
        }
        if self.unconfirmed.len() < MAX_UNCONFIRMED {
            self.unconfirmed.insert(record.transaction_hash.clone(), record);
        } else {
            tracing::debug!(hash = %record.transaction_hash, "Too many unconfirmed operations; not awaiting this one.");
        }
    }

    fn operation_completed(&mut self, data: OperationData) {
        let kind = self.correlator.settlement_target(data.kind);
        let hash = data.transaction_hash;
        let mut completed = None;
        self.correlator.resolve_with(kind, |request_id| {
            let record = OperationRecord {
                transaction_hash: hash.clone(),
                request_id,
                kind,
                error_message: None,
            };
            completed = Some(record.clone());
            Ok(Resolution::Operation(record))
        });

        let record = match completed {
            Some(record) => record,
            None => match self.unconfirmed.remove(&hash) {
                Some(record) => record,
                None => {
                    tracing::debug!(%kind, %hash, "Completion for an unknown operation dropped.");
                    return;
                }
            },
        };
        tracing::info!(%kind, %hash, "Operation confirmed by the wallet.");
        self.notify(WalletNotification::OperationConfirmed(record));
    }

    fn operation_failed(&mut self, info: ErrorInfo) {
        let kind = self.correlator.settlement_target(info.kind);
        let error = info.classify();
        let Some(request_id) = self.correlator.resolve(kind, Err(error)) else {
            tracing::debug!(%kind, "Late operation failure dropped.");
            return;
        };
        self.notify(WalletNotification::OperationFailed(OperationRecord {
            transaction_hash: String::new(),
            request_id,
            kind,
            error_message: Some(info.describe()),
        }));
    }

    fn payload_signed(&mut self, data: SignedData) {
        let result = SignResult {
            signature: data.signature,
            signing_type: data.signing_type.unwrap_or_default(),
            payload: data.payload.unwrap_or_default(),
        };
        let resolved = self
            .correlator
            .resolve(RequestKind::SignPayload, Ok(Resolution::Signed(result.clone())));
        if resolved.is_some() {
            self.notify(WalletNotification::PayloadSigned(result));
        } else {
            tracing::debug!("Late signature dropped.");
        }
    }

    /// Returns `true` when the tracker took over confirming `record`.
    fn track(&self, record: OperationRecord) -> bool {
        let Some(tracker) = &self.tracker else {
            return false;
        };
        let notifications = self.notifications.clone();
        let hash = record.transaction_hash.clone();
        let started = tracker.begin_tracking(hash, move |outcome| {
            let record = OperationRecord {
                error_message: outcome.error_message,
                ..record
            };
            let notification = if outcome.success {
                WalletNotification::OperationConfirmed(record)
            } else {
                WalletNotification::OperationFailed(record)
            };
            let _ = notifications.send(notification);
        });
        if let Err(e) = started {
            // Another loop already polls this hash.
            tracing::debug!("{}", e);
        }
        true
    }

    async fn expire_requests(&mut self) {
        for (kind, request_id) in self.correlator.expire(Instant::now()) {
            tracing::warn!(%kind, request_id, "Wallet request timed out.");
            match kind {
                RequestKind::Connect => {
                    if self.machine.abort_pairing("pairing timed out").is_some() {
                        self.publish();
                    }
                }
                RequestKind::Disconnect => {
                    self.session_ended("disconnect unacknowledged").await;
                }
                _ => {}
            }
        }
    }

    /// Persists and announces a freshly connected session.
    async fn session_established(&mut self) {
        self.persist().await;
        self.publish();
        self.notify(WalletNotification::Connected(self.machine.session().clone()));
    }

    /// Clears the session and fails every request except a pending disconnect.
    async fn session_ended(&mut self, reason: &'static str) {
        let failed = self
            .correlator
            .fail_all_except(Some(RequestKind::Disconnect), RequestError::SessionLost);
        if failed > 0 {
            tracing::info!(failed, "Outstanding requests cancelled by disconnect.");
        }
        self.unconfirmed.clear();
        if self.machine.disconnected(reason).is_none() {
            return;
        }
        tracing::info!(reason, "Wallet session ended.");
        self.persist().await;
        self.publish();
        self.notify(WalletNotification::Disconnected);
    }

    async fn persist(&self) {
        let session = self.machine.session();
        let result = if session.is_connected {
            self.store.save(&StoredSession::now(session.clone())).await
        } else {
            self.store.clear().await
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist wallet session: {}", e);
        }
    }

    fn publish(&self) {
        self.session_tx.send_replace(self.machine.snapshot());
    }

    fn notify(&self, notification: WalletNotification) {
        // No subscribers is not an error.
        let _ = self.notifications.send(notification);
    }
}
