pub mod cli;
pub mod config;
pub mod storage;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, EncodeCmd, SessionCmd, Source};
use config::{load_config, CliConfig};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use storage::SledStore;
use tezlink_connector::{
    codec::{self, DeepLinkCodec, DeepLinkKind},
    config::Tracker,
    inbound::EventNormalizer,
    status::{IndexerStatusSource, StatusSource},
    storage::SessionStore,
    transport::{BeaconNormalizer, BridgeNormalizer, DeepLinkNormalizer},
    workers::tracker::OperationTracker,
};
use tokio::sync::oneshot;

/// The main entry point for running the CLI.
/// This function handles argument parsing, configuration, logging and dispatch.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config_from_cli(cli.config.as_deref())?;
    tezlink_logger::init(&config.cli.log)?;
    tracing::debug!("Configuration loaded: {:#?}", &config);
    let output = execute(cli.command, &config).await?;
    println!("{}", output);

    Ok(())
}

/// Loads the configuration named on the command line, or the defaults.
fn load_config_from_cli(path: Option<&str>) -> Result<CliConfig> {
    match path {
        Some(config_path) => {
            eprintln!("Loading configuration from '{}'", config_path);
            load_config(config_path)
        }
        None => Ok(CliConfig::default()),
    }
}

/// Runs one command and returns what it prints.
pub async fn execute(command: Commands, config: &CliConfig) -> Result<String> {
    match command {
        Commands::Encode(cmd) => encode(cmd, config),
        Commands::Decode { link } => decode(&link),
        Commands::Normalize { source, raw } => normalize(source, &raw),
        Commands::Track { hash } => {
            let source = IndexerStatusSource::new(
                &config.wallet.network.indexer_url,
                Duration::from_secs(config.cli.indexer_timeout_secs),
            )?;
            track(Arc::new(source), &config.wallet.tracker, hash).await
        }
        Commands::Session(cmd) => {
            let store = SledStore::open(&config.cli.db_path)?;
            session(cmd, &store).await
        }
    }
}

fn encode(cmd: EncodeCmd, config: &CliConfig) -> Result<String> {
    let kind = DeepLinkKind::parse(&cmd.kind)
        .ok_or_else(|| anyhow!("Unknown link kind '{}'", cmd.kind))?;
    let codec = DeepLinkCodec::new(&config.wallet.deep_link.wallet_url)
        .context("Invalid wallet-url in deep-link configuration")?;
    Ok(codec.encode(kind, cmd.fields))
}

fn decode(link: &str) -> Result<String> {
    let params = codec::decode(link).ok_or_else(|| anyhow!("Not a deep link: '{}'", link))?;
    let event = match DeepLinkNormalizer.normalize(link) {
        Ok(Some(envelope)) => json!({ "EventType": envelope.event_type, "Data": envelope.data }),
        Ok(None) => Value::Null,
        Err(e) => {
            tracing::warn!("Link does not map to a wallet event: {}", e);
            Value::Null
        }
    };
    let output = json!({ "params": params.into_map(), "event": event });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn normalize(source: Source, raw: &str) -> Result<String> {
    let normalizer: Box<dyn EventNormalizer> = match source {
        Source::Bridge => Box::new(BridgeNormalizer),
        Source::DeepLink => Box::new(DeepLinkNormalizer),
        Source::Beacon => Box::new(BeaconNormalizer::default()),
    };
    match normalizer.normalize(raw).context("Failed to normalize message")? {
        Some(envelope) => Ok(envelope.to_json()?),
        None => Ok("no event".to_string()),
    }
}

/// Tracks `hash` until it settles and describes the outcome.
pub async fn track(
    source: Arc<dyn StatusSource>,
    settings: &Tracker,
    hash: String,
) -> Result<String> {
    let tracker = OperationTracker::new(source, settings);
    let (tx, rx) = oneshot::channel();
    tracker.begin_tracking(hash, move |outcome| {
        let _ = tx.send(outcome);
    })?;
    let outcome = rx.await.context("Tracking task ended without an outcome")?;

    if outcome.success {
        Ok(format!("{} confirmed", outcome.transaction_hash))
    } else {
        Ok(format!(
            "{} not confirmed: {}",
            outcome.transaction_hash,
            outcome.error_message.unwrap_or_default()
        ))
    }
}

/// Shows or clears the persisted session in `store`.
pub async fn session(cmd: SessionCmd, store: &dyn SessionStore) -> Result<String> {
    match cmd {
        SessionCmd::Show => match store.load().await? {
            Some(stored) => Ok(serde_json::to_string_pretty(&stored)?),
            None => Ok("no stored session".to_string()),
        },
        SessionCmd::Clear => {
            store.clear().await?;
            tracing::info!("Stored session cleared.");
            Ok("stored session cleared".to_string())
        }
    }
}
