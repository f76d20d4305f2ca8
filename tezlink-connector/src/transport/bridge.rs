//! In-process bridge to a JavaScript wallet library (browser builds).
//!
//! Calls go out as `{"method": ..., "params": ...}` JSON. The JavaScript side answers with
//! already-formed event envelopes, so normalization only validates them.

use super::{DisconnectMode, WalletInit, WalletTransport};
use crate::{
    error::{NormalizeError, TransportError},
    events::{EventEnvelope, EventType, WalletEvent},
    inbound::EventNormalizer,
    types::{
        ActiveAccount, ConnectorKind, ContractCall, OriginationRequest, SignPayloadRequest,
        WalletSession,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// The JavaScript side of the bridge.
pub trait BridgeHost: Send + Sync {
    fn call(&self, call: &BridgeCall) -> Result<(), TransportError>;

    /// Mirrors the library's `getActiveAccountAddress()`.
    fn active_account(&self) -> Option<ActiveAccount>;
}

/// The calls the JavaScript library exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum BridgeCall {
    InitWallet(WalletInit),
    ConnectAccount,
    DisconnectAccount,
    #[serde(rename_all = "camelCase")]
    SendContractCall {
        destination: String,
        amount: u64,
        entrypoint: String,
        arg: String,
    },
    #[serde(rename_all = "camelCase")]
    SignPayload { signing_type: u8, payload: String },
    #[serde(rename_all = "camelCase")]
    RequestContractOrigination {
        script: String,
        delegate_address: Option<String>,
    },
}

impl BridgeCall {
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub struct BridgeTransport {
    host: Arc<dyn BridgeHost>,
}

impl BridgeTransport {
    pub fn new(host: Arc<dyn BridgeHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl WalletTransport for BridgeTransport {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Bridge
    }

    fn normalizer(&self) -> Arc<dyn EventNormalizer> {
        Arc::new(BridgeNormalizer)
    }

    async fn init(&self, init: &WalletInit) -> Result<(), TransportError> {
        self.host.call(&BridgeCall::InitWallet(init.clone()))
    }

    async fn active_account(
        &self,
        _hint: Option<&WalletSession>,
    ) -> Result<Option<ActiveAccount>, TransportError> {
        Ok(self.host.active_account())
    }

    async fn connect_account(&self) -> Result<(), TransportError> {
        self.host.call(&BridgeCall::ConnectAccount)
    }

    /// `connectAccount` pairs and requests permissions in one step.
    async fn request_permissions(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect_account(&self) -> Result<DisconnectMode, TransportError> {
        self.host.call(&BridgeCall::DisconnectAccount)?;
        Ok(DisconnectMode::AwaitEvent)
    }

    async fn send_contract_call(&self, call: &ContractCall) -> Result<(), TransportError> {
        self.host.call(&BridgeCall::SendContractCall {
            destination: call.destination.clone(),
            amount: call.amount,
            entrypoint: call.entrypoint.clone(),
            arg: call.parameter.clone(),
        })
    }

    async fn sign_payload(&self, request: &SignPayloadRequest) -> Result<(), TransportError> {
        self.host.call(&BridgeCall::SignPayload {
            signing_type: request.signing_type.as_int(),
            payload: request.payload.clone(),
        })
    }

    async fn originate_contract(
        &self,
        request: &OriginationRequest,
    ) -> Result<(), TransportError> {
        self.host.call(&BridgeCall::RequestContractOrigination {
            script: request.script.clone(),
            delegate_address: request.delegate_address.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "EventType", alias = "eventType")]
    event_type: String,
    #[serde(rename = "Data", alias = "data", default)]
    data: Value,
}

/// Validates `{"EventType": ..., "Data": ...}` envelopes from the bridge.
///
/// `Data` may be a JSON-encoded string or an inline object.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeNormalizer;

impl EventNormalizer for BridgeNormalizer {
    fn normalize(&self, raw: &str) -> Result<Option<EventEnvelope>, NormalizeError> {
        let raw: RawEnvelope = serde_json::from_str(raw)?;
        let event_type = EventType::parse(&raw.event_type)
            .ok_or(NormalizeError::UnknownEventType(raw.event_type))?;
        let data = match raw.data {
            Value::String(data) if data.trim().is_empty() => "{}".to_string(),
            Value::String(data) => data,
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        let envelope = EventEnvelope { event_type, data };
        WalletEvent::from_envelope(&envelope)?;
        Ok(Some(envelope))
    }
}
