//! Deep-link transport for mobile wallets.
//!
//! Requests are URLs opened in the wallet app; the wallet answers by opening the dApp's
//! callback URL with the result in its query. The callback URL is what the host feeds to
//! the inbound sender.

use super::{DisconnectMode, WalletInit, WalletTransport};
use crate::{
    codec::{self, DeepLinkCodec, DeepLinkKind, DeepLinkParams},
    config::{AppMetadata, WalletConfig},
    error::{NormalizeError, TransportError},
    events::{EventEnvelope, EventType, OperationData, SignedData},
    inbound::EventNormalizer,
    types::{
        ActiveAccount, ConnectorKind, ContractCall, OperationKind, OriginationRequest,
        SignPayloadRequest, SigningType, WalletSession,
    },
};
use async_trait::async_trait;
use std::sync::Arc;

/// Opens a URL in whichever application handles its scheme.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), TransportError>;
}

/// Hands URLs to the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUrlOpener;

impl UrlOpener for SystemUrlOpener {
    fn open(&self, url: &str) -> Result<(), TransportError> {
        open::that(url).map_err(|e| TransportError::Unreachable(format!("cannot open {url}: {e}")))
    }
}

pub struct DeepLinkTransport {
    codec: DeepLinkCodec,
    opener: Arc<dyn UrlOpener>,
    network: String,
    app: AppMetadata,
    callback_url: String,
}

impl DeepLinkTransport {
    pub fn new(config: &WalletConfig, opener: Arc<dyn UrlOpener>) -> Result<Self, url::ParseError> {
        Ok(Self {
            codec: DeepLinkCodec::new(&config.deep_link.wallet_url)?,
            opener,
            network: config.network.name.clone(),
            app: config.app.clone(),
            callback_url: config.deep_link.callback_url.clone(),
        })
    }

    fn open(&self, kind: DeepLinkKind, mut fields: Vec<(&str, String)>) -> Result<(), TransportError> {
        fields.push(("network", self.network.clone()));
        fields.push(("callback", self.callback_url.clone()));
        let link = self.codec.encode(kind, fields);
        tracing::debug!(%kind, "Opening wallet deep link.");
        self.opener.open(&link)
    }
}

#[async_trait]
impl WalletTransport for DeepLinkTransport {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::DeepLink
    }

    fn normalizer(&self) -> Arc<dyn EventNormalizer> {
        Arc::new(DeepLinkNormalizer)
    }

    async fn init(&self, _init: &WalletInit) -> Result<(), TransportError> {
        Ok(())
    }

    /// Deep-link wallets keep no session the dApp can query, so the persisted one is trusted.
    async fn active_account(
        &self,
        hint: Option<&WalletSession>,
    ) -> Result<Option<ActiveAccount>, TransportError> {
        Ok(hint
            .filter(|session| session.connector_kind == ConnectorKind::DeepLink)
            .and_then(WalletSession::account))
    }

    async fn connect_account(&self) -> Result<(), TransportError> {
        self.open(
            DeepLinkKind::Login,
            vec![
                ("appName", self.app.name.clone()),
                ("appUrl", self.app.url.clone()),
                ("iconUrl", self.app.icon_url.clone()),
            ],
        )
    }

    /// The login link already asks for permissions.
    async fn request_permissions(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect_account(&self) -> Result<DisconnectMode, TransportError> {
        Ok(DisconnectMode::Immediate)
    }

    async fn send_contract_call(&self, call: &ContractCall) -> Result<(), TransportError> {
        self.open(
            DeepLinkKind::Operation,
            vec![
                ("destination", call.destination.clone()),
                ("amount", call.amount.to_string()),
                ("entrypoint", call.entrypoint.clone()),
                ("parameter", call.parameter.clone()),
            ],
        )
    }

    async fn sign_payload(&self, request: &SignPayloadRequest) -> Result<(), TransportError> {
        self.open(
            DeepLinkKind::Sign,
            vec![
                ("signingType", request.signing_type.as_int().to_string()),
                ("payload", request.payload.clone()),
            ],
        )
    }

    async fn originate_contract(
        &self,
        request: &OriginationRequest,
    ) -> Result<(), TransportError> {
        let mut fields = vec![("script", request.script.clone())];
        if let Some(delegate) = &request.delegate_address {
            fields.push(("delegateAddress", delegate.clone()));
        }
        self.open(DeepLinkKind::Originate, fields)
    }
}

/// Maps wallet callback URLs onto the event vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepLinkNormalizer;

impl EventNormalizer for DeepLinkNormalizer {
    fn normalize(&self, raw: &str) -> Result<Option<EventEnvelope>, NormalizeError> {
        let params = codec::decode(raw).ok_or(NormalizeError::InvalidDeepLink)?;
        let kind = params
            .kind()
            .ok_or_else(|| NormalizeError::Unsupported(format!("link type `{}`", params.raw_type())))?;
        let envelope = match params.error() {
            Some(info) => match kind {
                DeepLinkKind::Login => EventEnvelope::new(EventType::WalletConnectionFailed, &info)?,
                DeepLinkKind::Sign => EventEnvelope::new(EventType::PayloadSignFailed, &info)?,
                DeepLinkKind::Operation => EventEnvelope::new(
                    EventType::OperationFailed,
                    &info.with_kind(OperationKind::Operation),
                )?,
                DeepLinkKind::Originate => EventEnvelope::new(
                    EventType::OperationFailed,
                    &info.with_kind(OperationKind::Originate),
                )?,
            },
            None => success_envelope(kind, &params)?,
        };
        Ok(Some(envelope))
    }
}

fn success_envelope(
    kind: DeepLinkKind,
    params: &DeepLinkParams,
) -> Result<EventEnvelope, NormalizeError> {
    match kind {
        DeepLinkKind::Login => {
            let address = params
                .non_empty("address")
                .ok_or(NormalizeError::MissingField("address"))?;
            let account = ActiveAccount {
                address: address.to_string(),
                public_key: params.get("publicKey").to_string(),
                wallet_name: params.non_empty("walletName").map(str::to_string),
            };
            EventEnvelope::new(EventType::WalletConnected, &account)
        }
        DeepLinkKind::Operation | DeepLinkKind::Originate => {
            let transaction_hash = params
                .non_empty("transactionHash")
                .ok_or(NormalizeError::MissingField("transactionHash"))?;
            let kind = if kind == DeepLinkKind::Originate {
                OperationKind::Originate
            } else {
                OperationKind::Operation
            };
            EventEnvelope::new(
                EventType::OperationInjected,
                &OperationData {
                    transaction_hash: transaction_hash.to_string(),
                    kind: Some(kind),
                },
            )
        }
        DeepLinkKind::Sign => {
            let signature = params
                .non_empty("signature")
                .ok_or(NormalizeError::MissingField("signature"))?;
            EventEnvelope::new(
                EventType::PayloadSigned,
                &SignedData {
                    signature: signature.to_string(),
                    signing_type: params.non_empty("signingType").and_then(SigningType::parse),
                    payload: params.non_empty("payload").map(str::to_string),
                },
            )
        }
    }
}
