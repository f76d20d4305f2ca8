use anyhow::{Context, Result};
use serde::Deserialize;
use tezlink_connector::config::WalletConfig;
use tezlink_logger::LogConfig;

/// The top-level configuration for the tezlink CLI.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CliConfig {
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub cli: CliSpecificConfig,
}

/// Contains settings that are unique to the CLI binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliSpecificConfig {
    /// Directory of the sled database holding the persisted session.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Timeout of a single indexer request, in seconds.
    #[serde(default = "default_indexer_timeout")]
    pub indexer_timeout_secs: u64,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_db_path() -> String {
    "./tezlink_session.db".to_string()
}

fn default_indexer_timeout() -> u64 {
    10
}

impl Default for CliSpecificConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            indexer_timeout_secs: default_indexer_timeout(),
            log: LogConfig::default(),
        }
    }
}

/// Loads the CLI configuration from a TOML file, with `TEZLINK__*` environment overrides.
pub fn load_config(path: &str) -> Result<CliConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("TEZLINK").separator("__"));

    let settings: CliConfig = builder
        .build()
        .context(format!("Failed to build configuration from '{}'", path))?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(settings)
}
