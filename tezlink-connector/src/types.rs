//! # Domain Types
//!
//! Plain data shared by every layer of the connector: the session record, the request
//! payloads handed to wallets and the results they hand back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the transport used to reach the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    /// Beacon peer-to-peer messaging through a host-provided relay.
    #[default]
    #[serde(alias = "p2p")]
    Beacon,
    /// Custom-scheme URLs opened in the wallet app, answered by a callback URL.
    DeepLink,
    /// An in-process bridge to a JavaScript wallet library.
    Bridge,
}

impl ConnectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorKind::Beacon => "beacon",
            ConnectorKind::DeepLink => "deep-link",
            ConnectorKind::Bridge => "bridge",
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The category of an outstanding wallet request. At most one request per kind
/// is in flight at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    Connect,
    Disconnect,
    SignPayload,
    Operation,
    Originate,
}

impl RequestKind {
    pub const ALL: [RequestKind; 5] = [
        RequestKind::Connect,
        RequestKind::Disconnect,
        RequestKind::SignPayload,
        RequestKind::Operation,
        RequestKind::Originate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Connect => "connect",
            RequestKind::Disconnect => "disconnect",
            RequestKind::SignPayload => "sign-payload",
            RequestKind::Operation => "operation",
            RequestKind::Originate => "originate",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic identifier assigned to every request handle.
pub type RequestId = u64;

/// The account a wallet reports once permissions are granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAccount {
    #[serde(alias = "accountAddress")]
    pub address: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub wallet_name: Option<String>,
}

impl ActiveAccount {
    pub fn new(address: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: public_key.into(),
            wallet_name: None,
        }
    }
}

/// The current wallet pairing.
///
/// Invariant: when `is_connected` is false, `address` and `public_key` are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub connector_kind: ConnectorKind,
    pub address: String,
    pub public_key: String,
    pub is_connected: bool,
    #[serde(default)]
    pub pairing_uri: Option<String>,
    #[serde(default)]
    pub wallet_name: Option<String>,
}

impl WalletSession {
    /// A disconnected session for the given transport.
    pub fn empty(connector_kind: ConnectorKind) -> Self {
        Self {
            connector_kind,
            address: String::new(),
            public_key: String::new(),
            is_connected: false,
            pairing_uri: None,
            wallet_name: None,
        }
    }

    pub fn connected(connector_kind: ConnectorKind, account: ActiveAccount) -> Self {
        Self {
            connector_kind,
            address: account.address,
            public_key: account.public_key,
            is_connected: true,
            pairing_uri: None,
            wallet_name: account.wallet_name,
        }
    }

    /// The account this session is bound to, if any.
    pub fn account(&self) -> Option<ActiveAccount> {
        self.is_connected.then(|| ActiveAccount {
            address: self.address.clone(),
            public_key: self.public_key.clone(),
            wallet_name: self.wallet_name.clone(),
        })
    }
}

/// Whether an operation event refers to a contract call or an origination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Operation,
    Originate,
}

impl From<OperationKind> for RequestKind {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Operation => RequestKind::Operation,
            OperationKind::Originate => RequestKind::Originate,
        }
    }
}

/// The outcome of an injected operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub transaction_hash: String,
    pub request_id: RequestId,
    pub kind: RequestKind,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// How a payload should be interpreted by the wallet before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningType {
    #[default]
    Raw,
    Operation,
    Micheline,
}

impl SigningType {
    /// The integer encoding used on the wire by deep links and bridges.
    pub fn as_int(&self) -> u8 {
        match self {
            SigningType::Raw => 0,
            SigningType::Operation => 1,
            SigningType::Micheline => 2,
        }
    }

    pub fn from_int(value: u8) -> Option<Self> {
        match value {
            0 => Some(SigningType::Raw),
            1 => Some(SigningType::Operation),
            2 => Some(SigningType::Micheline),
            _ => None,
        }
    }

    /// Accepts either the integer or the lowercase name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(n) = value.parse::<u8>() {
            return Self::from_int(n);
        }
        match value.to_ascii_lowercase().as_str() {
            "raw" => Some(SigningType::Raw),
            "operation" => Some(SigningType::Operation),
            "micheline" => Some(SigningType::Micheline),
            _ => None,
        }
    }
}

/// A request to sign an arbitrary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPayloadRequest {
    pub signing_type: SigningType,
    pub payload: String,
}

/// A signature produced by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResult {
    pub signature: String,
    pub signing_type: SigningType,
    pub payload: String,
}

/// A smart-contract invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub destination: String,
    /// Amount in mutez.
    pub amount: u64,
    pub entrypoint: String,
    /// Michelson parameter encoded as Micheline JSON.
    pub parameter: String,
}

/// A contract deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginationRequest {
    /// Contract code and initial storage, as Micheline JSON.
    pub script: String,
    #[serde(default)]
    pub delegate_address: Option<String>,
}
