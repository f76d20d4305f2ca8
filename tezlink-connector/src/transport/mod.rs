//! # Wallet Transports
//!
//! A transport hands requests to a wallet over one channel (Beacon relay, deep links or an
//! in-process JavaScript bridge). Responses never come back through the call itself: the
//! host feeds raw inbound messages into an [`InboundSender`](crate::inbound::InboundSender),
//! and the transport's [`EventNormalizer`] turns them into
//! [`EventEnvelope`](crate::events::EventEnvelope)s.
//!
//! Host applications reach the platform through the sink traits [`BeaconHost`],
//! [`UrlOpener`] and [`BridgeHost`]. [`for_kind`] picks the transport named in the
//! configuration.

pub mod beacon;
pub mod bridge;
pub mod deeplink;

pub use beacon::{BeaconHost, BeaconNormalizer, BeaconRequest, BeaconTransport};
pub use bridge::{BridgeCall, BridgeHost, BridgeNormalizer, BridgeTransport};
pub use deeplink::{DeepLinkNormalizer, DeepLinkTransport, SystemUrlOpener, UrlOpener};

use crate::{
    config::WalletConfig,
    error::TransportError,
    inbound::EventNormalizer,
    types::{
        ActiveAccount, ConnectorKind, ContractCall, OriginationRequest, SignPayloadRequest,
        WalletSession,
    },
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// How a transport completes a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectMode {
    /// The wallet confirms with a `WalletDisconnected` event.
    AwaitEvent,
    /// Nothing will come back; the session is cleared right away.
    Immediate,
}

/// Parameters sent to the wallet SDK when the transport starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInit {
    pub network: String,
    pub rpc_url: String,
    pub provider_kind: ConnectorKind,
    pub app_name: String,
    pub app_url: String,
    pub icon_url: String,
}

impl WalletInit {
    pub fn from_config(config: &WalletConfig) -> Self {
        Self {
            network: config.network.name.clone(),
            rpc_url: config.network.rpc_url.clone(),
            provider_kind: config.connector,
            app_name: config.app.name.clone(),
            app_url: config.app.url.clone(),
            icon_url: config.app.icon_url.clone(),
        }
    }
}

/// The outbound half of a wallet connection.
///
/// Every send is fire-and-forget: `Ok(())` means the request left the process. A
/// [`TransportError::Unreachable`] surfaces to the caller as `NoActiveWallet`.
#[async_trait]
pub trait WalletTransport: Send + Sync {
    fn kind(&self) -> ConnectorKind;

    /// The normalizer for raw messages arriving from this transport's host.
    fn normalizer(&self) -> Arc<dyn EventNormalizer>;

    async fn init(&self, init: &WalletInit) -> Result<(), TransportError>;

    /// The account the transport is already connected to, if any.
    ///
    /// `hint` is the last persisted session, for transports that keep no state of their own.
    async fn active_account(
        &self,
        hint: Option<&WalletSession>,
    ) -> Result<Option<ActiveAccount>, TransportError>;

    async fn connect_account(&self) -> Result<(), TransportError>;

    /// Called once pairing completes to ask the wallet for an account.
    async fn request_permissions(&self) -> Result<(), TransportError>;

    async fn disconnect_account(&self) -> Result<DisconnectMode, TransportError>;

    async fn send_contract_call(&self, call: &ContractCall) -> Result<(), TransportError>;

    async fn sign_payload(&self, request: &SignPayloadRequest) -> Result<(), TransportError>;

    async fn originate_contract(&self, request: &OriginationRequest)
        -> Result<(), TransportError>;
}

/// Platform sinks a host application provides. Only the one matching the configured
/// transport is required.
#[derive(Clone, Default)]
pub struct PlatformHosts {
    pub beacon: Option<Arc<dyn BeaconHost>>,
    pub bridge: Option<Arc<dyn BridgeHost>>,
    pub opener: Option<Arc<dyn UrlOpener>>,
}

/// Builds the transport selected by `config.connector`.
///
/// Deep links fall back to [`SystemUrlOpener`] when no opener is supplied.
pub fn for_kind(
    config: &WalletConfig,
    hosts: PlatformHosts,
) -> Result<Arc<dyn WalletTransport>, TransportError> {
    let transport: Arc<dyn WalletTransport> = match config.connector {
        ConnectorKind::Beacon => {
            let host = hosts.beacon.ok_or_else(|| {
                TransportError::Unreachable("no Beacon host registered".to_string())
            })?;
            Arc::new(BeaconTransport::new(host, &config.network.name))
        }
        ConnectorKind::Bridge => {
            let host = hosts.bridge.ok_or_else(|| {
                TransportError::Unreachable("no JavaScript bridge registered".to_string())
            })?;
            Arc::new(BridgeTransport::new(host))
        }
        ConnectorKind::DeepLink => {
            let opener = hosts
                .opener
                .unwrap_or_else(|| Arc::new(SystemUrlOpener) as Arc<dyn UrlOpener>);
            Arc::new(DeepLinkTransport::new(config, opener)?)
        }
    };
    tracing::info!(connector = %transport.kind(), "Wallet transport selected.");
    Ok(transport)
}
