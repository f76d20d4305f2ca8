use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};

/// Developer tooling for tezlink wallet connections.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    /// If not provided, default values will be used.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a deep link for the configured wallet.
    Encode(EncodeCmd),
    /// Print the parameters of a deep link and the event it maps to.
    Decode {
        link: String,
    },
    /// Turn a raw wallet message into event envelope JSON.
    Normalize {
        #[arg(short, long, value_enum)]
        source: Source,
        raw: String,
    },
    /// Poll the indexer until an operation is applied or tracking times out.
    Track {
        hash: String,
    },
    /// Inspect or clear the persisted wallet session.
    #[command(subcommand)]
    Session(SessionCmd),
}

#[derive(Parser, Debug)]
pub struct EncodeCmd {
    /// One of `login`, `operation`, `sign`, `originate`.
    pub kind: String,
    /// A `key=value` query field. Repeatable.
    #[arg(short, long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SessionCmd {
    Show,
    Clear,
}

/// Where a raw message came from.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Bridge,
    DeepLink,
    Beacon,
}

fn parse_field(value: &str) -> Result<(String, String)> {
    let (key, value) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", value))?;
    if key.is_empty() {
        return Err(anyhow!("empty field name in '{}={}'", key, value));
    }
    Ok((key.to_string(), value.to_string()))
}
