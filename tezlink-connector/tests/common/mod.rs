#![allow(dead_code)]

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tezlink_connector::{
    config::WalletConfig,
    error::TransportError,
    events::{EventEnvelope, EventType},
    inbound::EventNormalizer,
    status::{StatusError, StatusSource},
    storage::{MemoryStore, SessionStore},
    transport::{BridgeNormalizer, DisconnectMode, WalletInit, WalletTransport},
    types::{
        ActiveAccount, ConnectorKind, ContractCall, OriginationRequest, SignPayloadRequest,
        WalletSession,
    },
    WalletHandle, WalletManager,
};

/// An outbound call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init,
    ConnectAccount,
    RequestPermissions,
    DisconnectAccount,
    ContractCall(ContractCall),
    SignPayload(SignPayloadRequest),
    Originate(OriginationRequest),
}

/// A transport that records every call and answers with canned values.
///
/// Inbound traffic is expected as bridge-style envelope JSON.
pub struct MockTransport {
    kind: ConnectorKind,
    active: Mutex<Option<ActiveAccount>>,
    reachable: Mutex<bool>,
    disconnect_mode: DisconnectMode,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new(kind: ConnectorKind) -> Self {
        Self {
            kind,
            active: Mutex::new(None),
            reachable: Mutex::new(true),
            disconnect_mode: DisconnectMode::AwaitEvent,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_active_account(self, account: ActiveAccount) -> Self {
        *self.active.lock().unwrap() = Some(account);
        self
    }

    pub fn with_disconnect_mode(mut self, mode: DisconnectMode) -> Self {
        self.disconnect_mode = mode;
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        *self.reachable.lock().unwrap() = reachable;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) -> Result<(), TransportError> {
        if !*self.reachable.lock().unwrap() {
            return Err(TransportError::Unreachable("mock wallet offline".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl WalletTransport for MockTransport {
    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    fn normalizer(&self) -> Arc<dyn EventNormalizer> {
        Arc::new(BridgeNormalizer)
    }

    async fn init(&self, _init: &WalletInit) -> Result<(), TransportError> {
        self.record(Call::Init)
    }

    async fn active_account(
        &self,
        hint: Option<&WalletSession>,
    ) -> Result<Option<ActiveAccount>, TransportError> {
        if let Some(account) = self.active.lock().unwrap().clone() {
            return Ok(Some(account));
        }
        Ok(hint.and_then(WalletSession::account).filter(|_| self.kind == ConnectorKind::DeepLink))
    }

    async fn connect_account(&self) -> Result<(), TransportError> {
        self.record(Call::ConnectAccount)
    }

    async fn request_permissions(&self) -> Result<(), TransportError> {
        self.record(Call::RequestPermissions)
    }

    async fn disconnect_account(&self) -> Result<DisconnectMode, TransportError> {
        self.record(Call::DisconnectAccount)?;
        *self.active.lock().unwrap() = None;
        Ok(self.disconnect_mode)
    }

    async fn send_contract_call(&self, call: &ContractCall) -> Result<(), TransportError> {
        self.record(Call::ContractCall(call.clone()))
    }

    async fn sign_payload(&self, request: &SignPayloadRequest) -> Result<(), TransportError> {
        self.record(Call::SignPayload(request.clone()))
    }

    async fn originate_contract(
        &self,
        request: &OriginationRequest,
    ) -> Result<(), TransportError> {
        self.record(Call::Originate(request.clone()))
    }
}

/// A status source that replays a fixed script of answers, then keeps answering `false`.
pub struct ScriptedStatus {
    answers: Mutex<VecDeque<Result<Option<bool>, ()>>>,
    polls: AtomicUsize,
}

impl ScriptedStatus {
    pub fn new(answers: Vec<Option<bool>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Ok).collect()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answers: Mutex::new(VecDeque::from([Err(())])),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn operation_status(&self, _hash: &str) -> Result<Option<bool>, StatusError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(())) => Err(StatusError::Unexpected { status: 500 }),
            None => Ok(Some(false)),
        }
    }
}

/// Short timeouts so paused-clock tests stay readable.
pub fn test_config(kind: ConnectorKind) -> WalletConfig {
    let mut config = WalletConfig::default();
    config.connector = kind;
    config.timeouts.connect_secs = 10;
    config.timeouts.request_secs = 2;
    config
}

pub struct Harness {
    pub handle: WalletHandle,
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryStore>,
}

/// Spawns a manager over `transport` with an in-memory store.
pub async fn start(transport: MockTransport) -> Harness {
    start_with(transport, MemoryStore::new(), test_config(ConnectorKind::Beacon)).await
}

pub async fn start_with(transport: MockTransport, store: MemoryStore, config: WalletConfig) -> Harness {
    let transport = Arc::new(transport);
    let store = Arc::new(store);
    let (manager, handle) = WalletManager::new(
        Arc::new(config),
        transport.clone(),
        store.clone() as Arc<dyn SessionStore>,
    );
    tokio::spawn(manager.run());
    settle().await;
    Harness {
        handle,
        transport,
        store,
    }
}

/// Lets the manager task drain its queues.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

pub fn envelope(event_type: EventType, data: serde_json::Value) -> String {
    EventEnvelope {
        event_type,
        data: data.to_string(),
    }
    .to_json()
    .unwrap()
}

pub fn account(address: &str, public_key: &str) -> ActiveAccount {
    ActiveAccount::new(address, public_key)
}

pub fn contract_call() -> ContractCall {
    ContractCall {
        destination: "KT1PWx2mnDueood7fEmfbBDKx1D9BAnnXitn".to_string(),
        amount: 0,
        entrypoint: "mint".to_string(),
        parameter: r#"{"int":"1"}"#.to_string(),
    }
}
