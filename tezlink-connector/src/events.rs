use crate::{
    error::{NormalizeError, RequestError},
    types::{ActiveAccount, OperationKind, SigningType},
};
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The closed vocabulary of wallet events every transport is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    PairingRequested,
    PairingDone,
    WalletConnected,
    WalletConnectionFailed,
    WalletDisconnected,
    OperationInjected,
    OperationCompleted,
    OperationFailed,
    PayloadSigned,
    PayloadSignFailed,
    SdkInitialized,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PairingRequested => "PairingRequested",
            EventType::PairingDone => "PairingDone",
            EventType::WalletConnected => "WalletConnected",
            EventType::WalletConnectionFailed => "WalletConnectionFailed",
            EventType::WalletDisconnected => "WalletDisconnected",
            EventType::OperationInjected => "OperationInjected",
            EventType::OperationCompleted => "OperationCompleted",
            EventType::OperationFailed => "OperationFailed",
            EventType::PayloadSigned => "PayloadSigned",
            EventType::PayloadSignFailed => "PayloadSignFailed",
            EventType::SdkInitialized => "SDKInitialized",
        }
    }

    /// Parses a canonical name or one of the older aliases still emitted by some bridges.
    pub fn parse(name: &str) -> Option<Self> {
        let event_type = match name.trim() {
            "PairingRequested" | "HandshakeReceived" => EventType::PairingRequested,
            "PairingDone" | "PairingCompleted" => EventType::PairingDone,
            "WalletConnected" | "AccountConnected" => EventType::WalletConnected,
            "WalletConnectionFailed" | "AccountConnectionFailed" => {
                EventType::WalletConnectionFailed
            }
            "WalletDisconnected" | "AccountDisconnected" => EventType::WalletDisconnected,
            "OperationInjected" | "ContractCallInjected" => EventType::OperationInjected,
            "OperationCompleted" | "ContractCallCompleted" => EventType::OperationCompleted,
            "OperationFailed" | "ContractCallFailed" => EventType::OperationFailed,
            "PayloadSigned" => EventType::PayloadSigned,
            "PayloadSignFailed" => EventType::PayloadSignFailed,
            "SDKInitialized" | "SdkInitialized" => EventType::SdkInitialized,
            _ => return None,
        };
        Some(event_type)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        EventType::parse(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown event type `{name}`")))
    }
}

/// The canonical unit of inbound wallet traffic.
///
/// `data` is itself a JSON document whose shape depends on `event_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "EventType")]
    pub event_type: EventType,
    #[serde(rename = "Data")]
    pub data: String,
}

impl EventEnvelope {
    pub fn new(event_type: EventType, payload: &impl Serialize) -> Result<Self, NormalizeError> {
        Ok(Self {
            event_type,
            data: serde_json::to_string(payload)?,
        })
    }

    /// An envelope whose event carries no payload.
    pub fn bare(event_type: EventType) -> Self {
        Self {
            event_type,
            data: "{}".to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, NormalizeError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingData {
    #[serde(alias = "pairingUri")]
    pub pairing_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationData {
    #[serde(alias = "opHash", alias = "operationHash")]
    pub transaction_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OperationKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedData {
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_type: Option<SigningType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Failure details carried by every `*Failed` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OperationKind>,
}

impl ErrorInfo {
    pub fn new(error_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_id: Some(error_id.into()),
            error_message: Some(error_message.into()),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn classify(&self) -> RequestError {
        RequestError::from_wallet(
            self.error_id.as_deref().unwrap_or(""),
            self.error_message.as_deref().unwrap_or(""),
        )
    }

    /// The message to surface to users, falling back to the id.
    pub fn describe(&self) -> String {
        match (self.error_message.as_deref(), self.error_id.as_deref()) {
            (Some(m), _) if !m.is_empty() => m.to_string(),
            (_, Some(id)) if !id.is_empty() => id.to_string(),
            _ => "unknown wallet error".to_string(),
        }
    }
}

/// A decoded wallet event, ready for the manager to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    PairingRequested { pairing_uri: String },
    PairingDone,
    Connected(ActiveAccount),
    ConnectionFailed(ErrorInfo),
    Disconnected,
    OperationInjected(OperationData),
    OperationCompleted(OperationData),
    OperationFailed(ErrorInfo),
    PayloadSigned(SignedData),
    PayloadSignFailed(ErrorInfo),
    SdkInitialized,
}

impl WalletEvent {
    /// Decodes the payload of an envelope according to its event type.
    ///
    /// Failure events tolerate an unreadable payload and decode as an error without details.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self, NormalizeError> {
        let event = match envelope.event_type {
            EventType::PairingRequested => {
                let data: PairingData = payload(envelope)?;
                if data.pairing_data.is_empty() {
                    return Err(NormalizeError::MissingField("pairingData"));
                }
                WalletEvent::PairingRequested {
                    pairing_uri: data.pairing_data,
                }
            }
            EventType::PairingDone => WalletEvent::PairingDone,
            EventType::WalletConnected => {
                let account: ActiveAccount = payload(envelope)?;
                if account.address.is_empty() {
                    return Err(NormalizeError::MissingField("address"));
                }
                WalletEvent::Connected(account)
            }
            EventType::WalletConnectionFailed => {
                WalletEvent::ConnectionFailed(error_payload(envelope))
            }
            EventType::WalletDisconnected => WalletEvent::Disconnected,
            EventType::OperationInjected => WalletEvent::OperationInjected(operation(envelope)?),
            EventType::OperationCompleted => {
                WalletEvent::OperationCompleted(operation(envelope)?)
            }
            EventType::OperationFailed => WalletEvent::OperationFailed(error_payload(envelope)),
            EventType::PayloadSigned => {
                let data: SignedData = payload(envelope)?;
                if data.signature.is_empty() {
                    return Err(NormalizeError::MissingField("signature"));
                }
                WalletEvent::PayloadSigned(data)
            }
            EventType::PayloadSignFailed => {
                WalletEvent::PayloadSignFailed(error_payload(envelope))
            }
            EventType::SdkInitialized => WalletEvent::SdkInitialized,
        };
        Ok(event)
    }
}

fn payload<T: DeserializeOwned>(envelope: &EventEnvelope) -> Result<T, NormalizeError> {
    Ok(serde_json::from_str(&envelope.data)?)
}

fn operation(envelope: &EventEnvelope) -> Result<OperationData, NormalizeError> {
    let data: OperationData = payload(envelope)?;
    if data.transaction_hash.is_empty() {
        return Err(NormalizeError::MissingField("transactionHash"));
    }
    Ok(data)
}

fn error_payload(envelope: &EventEnvelope) -> ErrorInfo {
    serde_json::from_str(&envelope.data).unwrap_or_else(|e| {
        tracing::debug!(event_type = %envelope.event_type, "Unreadable error payload: {}", e);
        ErrorInfo::default()
    })
}
