//! Error types surfaced by the connector.

use crate::types::RequestKind;
use std::time::Duration;
use thiserror::Error;

/// Wallet error ids that mean the user declined the request.
pub const USER_REJECTION_IDS: [&str; 2] = ["ABORTED_ERROR", "NOT_GRANTED_ERROR"];
/// Wallet error id reported when the wallet could not say what went wrong.
pub const UNKNOWN_ERROR_ID: &str = "UNKNOWN_ERROR";

/// The failure a pending request resolves with.
///
/// Cloneable so a single outcome can be observed by every clone of a request handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("no active wallet: pair a wallet first")]
    NoActiveWallet,
    #[error("request rejected by the user: {message}")]
    UserRejected { message: String },
    #[error("wallet error {id}: {message}")]
    WalletError { id: String, message: String },
    #[error("wallet failed without details: {message}")]
    Unknown { message: String },
    #[error("{kind} request timed out after {after:?}")]
    Timeout { kind: RequestKind, after: Duration },
    #[error("wallet session lost")]
    SessionLost,
}

impl RequestError {
    /// Classifies a wallet-reported failure.
    pub fn from_wallet(error_id: &str, error_message: &str) -> Self {
        let id = error_id.trim();
        let message = error_message.trim();
        let lowered = message.to_ascii_lowercase();

        if USER_REJECTION_IDS.contains(&id)
            || lowered.contains("reject")
            || lowered.contains("abort")
        {
            let message = if message.is_empty() { id } else { message };
            return RequestError::UserRejected {
                message: message.to_string(),
            };
        }
        if id == UNKNOWN_ERROR_ID || (id.is_empty() && message.is_empty()) {
            return RequestError::Unknown {
                message: message.to_string(),
            };
        }
        RequestError::WalletError {
            id: id.to_string(),
            message: message.to_string(),
        }
    }
}

/// A failure raised by a transport while handing a request to the wallet.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The wallet (or the host that reaches it) cannot be contacted.
    #[error("wallet unreachable: {0}")]
    Unreachable(String),
    #[error("host rejected the call: {0}")]
    Host(String),
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid wallet URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unreachable(_) => RequestError::NoActiveWallet,
            other => RequestError::WalletError {
                id: "TRANSPORT_ERROR".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// A raw inbound message that could not be turned into an event envelope.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("unknown event type `{0}`")]
    UnknownEventType(String),
    #[error("malformed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unparsable deep link")]
    InvalidDeepLink,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("unsupported message: {0}")]
    Unsupported(String),
}
