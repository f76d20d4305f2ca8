use crate::types::{ConnectorKind, RequestKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The top-level configuration for the `tezlink-connector` library.
///
/// This struct aggregates the network the dApp targets, the metadata shown to wallets,
/// the transport to use and the timing of requests and operation tracking. It is
/// typically deserialized from a configuration file and passed to the `WalletManager`
/// upon initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WalletConfig {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub app: AppMetadata,
    #[serde(default)]
    pub connector: ConnectorKind,
    #[serde(default)]
    pub deep_link: DeepLink,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub channels: ChannelConfig,
}

/// The Tezos network wallets should sign for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Network {
    pub name: String,
    pub rpc_url: String,
    /// Base URL of a TzKT-compatible indexer, used for operation status checks.
    pub indexer_url: String,
}

/// dApp identity presented to the wallet during pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppMetadata {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub icon_url: String,
}

/// Deep-link endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeepLink {
    /// Base URL of the wallet app, e.g. `tezos://wallet/`.
    pub wallet_url: String,
    /// URL the wallet opens to hand the result back to the dApp.
    pub callback_url: String,
}

/// Request deadlines in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Timeouts {
    pub connect_secs: u64,
    /// Applies to every request kind other than connect.
    pub request_secs: u64,
}

/// Behavior of the operation tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tracker {
    pub enabled: bool,
    /// How long to keep polling before giving up on confirmation.
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

/// Defines capacities for the MPSC and broadcast channels within the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChannelConfig {
    /// The buffer capacity for the command channel to the manager.
    pub command_buffer: usize,
    /// The buffer capacity for normalized inbound wallet events.
    pub inbound_buffer: usize,
    /// The capacity of the notification broadcast channel.
    pub notification_buffer: usize,
}

impl Timeouts {
    /// The deadline applied to a request of the given kind.
    pub fn for_kind(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Connect => Duration::from_secs(self.connect_secs),
            _ => Duration::from_secs(self.request_secs),
        }
    }
}

impl Tracker {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self {
            name: "ghostnet".to_string(),
            rpc_url: "https://rpc.ghostnet.teztnets.com".to_string(),
            indexer_url: "https://api.ghostnet.tzkt.io/v1".to_string(),
        }
    }
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "tezlink dApp".to_string(),
            url: "https://tezos.com".to_string(),
            icon_url: String::new(),
        }
    }
}

impl Default for DeepLink {
    fn default() -> Self {
        Self {
            wallet_url: "tezos://wallet/".to_string(),
            callback_url: "tezlink://callback".to_string(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: 120,
            request_secs: 45,
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 45,
            poll_interval_ms: 2000,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            inbound_buffer: 256,
            notification_buffer: 64,
        }
    }
}
