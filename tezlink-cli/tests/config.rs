use serial_test::serial;
use std::io::Write;
use tezlink_cli::config::{load_config, CliConfig};
use tezlink_connector::types::ConnectorKind;
use tezlink_logger::{LogFormat, LogOutput};

/// Writes `contents` to a temporary `.toml` file and returns its handle.
fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn loads_every_section() {
    let file = config_file(
        r#"
        [wallet]
        connector = "deep-link"

        [wallet.network]
        name = "mainnet"
        rpc-url = "https://mainnet.api.tez.ie"
        indexer-url = "https://api.tzkt.io/v1"

        [wallet.timeouts]
        connect-secs = 90
        request-secs = 30

        [wallet.tracker]
        enabled = false
        timeout-secs = 60
        poll-interval-ms = 500

        [cli]
        db-path = "/tmp/tezlink-test.db"

        [cli.log]
        level = "debug"
        format = "json"
        "#,
    );

    let config = load_config(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.wallet.connector, ConnectorKind::DeepLink);
    assert_eq!(config.wallet.network.name, "mainnet");
    assert_eq!(config.wallet.timeouts.connect_secs, 90);
    assert!(!config.wallet.tracker.enabled);
    assert_eq!(config.wallet.tracker.poll_interval_ms, 500);
    assert_eq!(config.wallet.deep_link.wallet_url, "tezos://wallet/");
    assert_eq!(config.cli.db_path, "/tmp/tezlink-test.db");
    assert_eq!(config.cli.indexer_timeout_secs, 10);
    assert_eq!(config.cli.log.format, LogFormat::Json);
    assert_eq!(config.cli.log.output, LogOutput::Stdout);
}

#[test]
#[serial]
fn missing_sections_fall_back_to_defaults() {
    let file = config_file("[cli]\ndb-path = \"./session.db\"\n");

    let config = load_config(file.path().to_str().unwrap()).unwrap();

    let defaults = CliConfig::default();
    assert_eq!(config.wallet.network.name, defaults.wallet.network.name);
    assert_eq!(config.wallet.connector, ConnectorKind::Beacon);
    assert_eq!(config.wallet.timeouts.connect_secs, 120);
    assert_eq!(config.wallet.timeouts.request_secs, 45);
    assert_eq!(config.cli.log.level, "info");
}

#[test]
#[serial]
fn a_partial_cli_section_keeps_the_default_db_path() {
    let file = config_file("[cli]\nindexer-timeout-secs = 3\n\n[cli.log]\nlevel = \"warn\"\n");

    let config = load_config(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.cli.db_path, CliConfig::default().cli.db_path);
    assert_eq!(config.cli.indexer_timeout_secs, 3);
    assert_eq!(config.cli.log.level, "warn");
}

#[test]
#[serial]
fn environment_overrides_the_file() {
    let file = config_file("[wallet.network]\nname = \"ghostnet\"\nrpc-url = \"r\"\nindexer-url = \"i\"\n");

    std::env::set_var("TEZLINK__WALLET__NETWORK__NAME", "parisnet");
    let config = load_config(file.path().to_str().unwrap());
    std::env::remove_var("TEZLINK__WALLET__NETWORK__NAME");

    assert_eq!(config.unwrap().wallet.network.name, "parisnet");
}

#[test]
#[serial]
fn a_missing_file_is_an_error() {
    let err = load_config("/nonexistent/tezlink.toml").unwrap_err();

    assert!(err.to_string().contains("Failed to build configuration"));
}

#[test]
#[serial]
fn unknown_connectors_are_rejected() {
    let file = config_file("[wallet]\nconnector = \"carrier-pigeon\"\n");

    assert!(load_config(file.path().to_str().unwrap()).is_err());
}
