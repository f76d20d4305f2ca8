//! Beacon peer-to-peer transport.
//!
//! Messages are exchanged as JSON objects tagged by `type`. Beacon responses echo the id
//! of the request they answer; the transport remembers which request kind each id was
//! issued for so an `operation_response` can be routed to an origination when that is
//! what was asked.

use super::{DisconnectMode, WalletInit, WalletTransport};
use crate::{
    error::{NormalizeError, TransportError},
    events::{EventEnvelope, EventType, ErrorInfo, OperationData, PairingData, SignedData},
    inbound::EventNormalizer,
    types::{
        ActiveAccount, ConnectorKind, ContractCall, OperationKind, OriginationRequest,
        RequestKind, SignPayloadRequest, SigningType, WalletSession,
    },
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Beacon permission scopes requested on pairing.
pub const PERMISSION_SCOPES: [&str; 2] = ["operation_request", "sign"];

/// The platform side of a Beacon connection, typically a WebView or a native Beacon SDK.
///
/// The host posts every inbound Beacon message, as JSON, to the manager's inbound sender.
/// Once a peer is removed it reports a `disconnect` message.
pub trait BeaconHost: Send + Sync {
    fn post(&self, message: &BeaconRequest) -> Result<(), TransportError>;

    /// The account of the currently paired peer, if any.
    fn active_account(&self) -> Option<ActiveAccount>;
}

/// Outbound Beacon messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BeaconRequest {
    Init(WalletInit),
    PairingRequest,
    PermissionRequest {
        id: String,
        network: String,
        scopes: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    OperationRequest {
        id: String,
        network: String,
        operation_details: Vec<OperationDetail>,
    },
    #[serde(rename_all = "camelCase")]
    SignPayloadRequest {
        id: String,
        signing_type: SigningType,
        payload: String,
    },
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationDetail {
    Transaction {
        destination: String,
        amount: String,
        parameters: TransactionParameters,
    },
    Origination {
        script: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        delegate: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionParameters {
    pub entrypoint: String,
    pub value: String,
}

/// Inbound Beacon messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BeaconResponse {
    #[serde(rename_all = "camelCase")]
    PairingRequested {
        #[serde(alias = "pairingData")]
        pairing_uri: String,
    },
    PairingDone,
    #[serde(rename_all = "camelCase")]
    PermissionResponse {
        #[serde(default)]
        id: Option<String>,
        address: String,
        #[serde(default)]
        public_key: String,
        #[serde(default)]
        wallet_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    OperationResponse {
        #[serde(default)]
        id: Option<String>,
        transaction_hash: String,
    },
    #[serde(rename_all = "camelCase")]
    SignPayloadResponse {
        #[serde(default)]
        id: Option<String>,
        signature: String,
        #[serde(default)]
        signing_type: Option<SigningType>,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        error_type: String,
        #[serde(default)]
        error_message: Option<String>,
    },
    Disconnect,
    Acknowledge {
        #[serde(default)]
        id: Option<String>,
    },
}

type InFlight = Arc<DashMap<String, RequestKind>>;

pub struct BeaconTransport {
    host: Arc<dyn BeaconHost>,
    network: String,
    in_flight: InFlight,
    next_id: AtomicU64,
}

impl BeaconTransport {
    pub fn new(host: Arc<dyn BeaconHost>, network: &str) -> Self {
        Self {
            host,
            network: network.to_string(),
            in_flight: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates a message id for `kind`, forgetting any older id of the same kind.
    fn track(&self, kind: RequestKind) -> String {
        let id = format!("tezlink-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.in_flight.retain(|_, k| *k != kind);
        self.in_flight.insert(id.clone(), kind);
        id
    }

    fn post(&self, message: BeaconRequest) -> Result<(), TransportError> {
        self.host.post(&message)
    }
}

#[async_trait]
impl WalletTransport for BeaconTransport {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Beacon
    }

    fn normalizer(&self) -> Arc<dyn EventNormalizer> {
        Arc::new(BeaconNormalizer {
            in_flight: self.in_flight.clone(),
        })
    }

    async fn init(&self, init: &WalletInit) -> Result<(), TransportError> {
        self.post(BeaconRequest::Init(init.clone()))
    }

    async fn active_account(
        &self,
        _hint: Option<&WalletSession>,
    ) -> Result<Option<ActiveAccount>, TransportError> {
        Ok(self.host.active_account())
    }

    async fn connect_account(&self) -> Result<(), TransportError> {
        self.post(BeaconRequest::PairingRequest)
    }

    async fn request_permissions(&self) -> Result<(), TransportError> {
        let id = self.track(RequestKind::Connect);
        self.post(BeaconRequest::PermissionRequest {
            id,
            network: self.network.clone(),
            scopes: PERMISSION_SCOPES.iter().map(|s| s.to_string()).collect(),
        })
    }

    async fn disconnect_account(&self) -> Result<DisconnectMode, TransportError> {
        self.post(BeaconRequest::Disconnect)?;
        self.in_flight.clear();
        Ok(DisconnectMode::AwaitEvent)
    }

    async fn send_contract_call(&self, call: &ContractCall) -> Result<(), TransportError> {
        let id = self.track(RequestKind::Operation);
        self.post(BeaconRequest::OperationRequest {
            id,
            network: self.network.clone(),
            operation_details: vec![OperationDetail::Transaction {
                destination: call.destination.clone(),
                amount: call.amount.to_string(),
                parameters: TransactionParameters {
                    entrypoint: call.entrypoint.clone(),
                    value: call.parameter.clone(),
                },
            }],
        })
    }

    async fn sign_payload(&self, request: &SignPayloadRequest) -> Result<(), TransportError> {
        let id = self.track(RequestKind::SignPayload);
        self.post(BeaconRequest::SignPayloadRequest {
            id,
            signing_type: request.signing_type,
            payload: request.payload.clone(),
        })
    }

    async fn originate_contract(
        &self,
        request: &OriginationRequest,
    ) -> Result<(), TransportError> {
        let id = self.track(RequestKind::Originate);
        self.post(BeaconRequest::OperationRequest {
            id,
            network: self.network.clone(),
            operation_details: vec![OperationDetail::Origination {
                script: request.script.clone(),
                delegate: request.delegate_address.clone(),
            }],
        })
    }
}

/// Maps Beacon messages onto the event vocabulary.
///
/// Without an in-flight table (for example when used standalone) responses are routed by
/// message type only.
#[derive(Debug, Clone, Default)]
pub struct BeaconNormalizer {
    in_flight: InFlight,
}

impl BeaconNormalizer {
    fn take(&self, id: Option<&str>) -> Option<RequestKind> {
        id.and_then(|id| self.in_flight.remove(id)).map(|(_, kind)| kind)
    }
}

impl EventNormalizer for BeaconNormalizer {
    fn normalize(&self, raw: &str) -> Result<Option<EventEnvelope>, NormalizeError> {
        let message: BeaconResponse = serde_json::from_str(raw)?;
        let envelope = match message {
            BeaconResponse::PairingRequested { pairing_uri } => EventEnvelope::new(
                EventType::PairingRequested,
                &PairingData {
                    pairing_data: pairing_uri,
                },
            )?,
            BeaconResponse::PairingDone => EventEnvelope::bare(EventType::PairingDone),
            BeaconResponse::PermissionResponse {
                id,
                address,
                public_key,
                wallet_name,
            } => {
                self.take(id.as_deref());
                EventEnvelope::new(
                    EventType::WalletConnected,
                    &ActiveAccount {
                        address,
                        public_key,
                        wallet_name,
                    },
                )?
            }
            BeaconResponse::OperationResponse {
                id,
                transaction_hash,
            } => {
                let kind = match self.take(id.as_deref()) {
                    Some(RequestKind::Originate) => OperationKind::Originate,
                    _ => OperationKind::Operation,
                };
                EventEnvelope::new(
                    EventType::OperationInjected,
                    &OperationData {
                        transaction_hash,
                        kind: Some(kind),
                    },
                )?
            }
            BeaconResponse::SignPayloadResponse {
                id,
                signature,
                signing_type,
            } => {
                self.take(id.as_deref());
                EventEnvelope::new(
                    EventType::PayloadSigned,
                    &SignedData {
                        signature,
                        signing_type,
                        payload: None,
                    },
                )?
            }
            BeaconResponse::Error {
                id,
                error_type,
                error_message,
            } => {
                let info = ErrorInfo {
                    error_id: Some(error_type),
                    error_message,
                    kind: None,
                };
                let (event_type, info) = match self.take(id.as_deref()) {
                    Some(RequestKind::SignPayload) => (EventType::PayloadSignFailed, info),
                    Some(RequestKind::Operation) => (
                        EventType::OperationFailed,
                        info.with_kind(OperationKind::Operation),
                    ),
                    Some(RequestKind::Originate) => (
                        EventType::OperationFailed,
                        info.with_kind(OperationKind::Originate),
                    ),
                    Some(RequestKind::Disconnect) => {
                        return Err(NormalizeError::Unsupported(format!(
                            "error for disconnect: {}",
                            info.describe()
                        )));
                    }
                    Some(RequestKind::Connect) | None => (EventType::WalletConnectionFailed, info),
                };
                EventEnvelope::new(event_type, &info)?
            }
            BeaconResponse::Disconnect => {
                self.in_flight.clear();
                EventEnvelope::bare(EventType::WalletDisconnected)
            }
            BeaconResponse::Acknowledge { id } => {
                tracing::debug!(id = id.as_deref().unwrap_or(""), "Beacon request acknowledged.");
                return Ok(None);
            }
        };
        Ok(Some(envelope))
    }
}
