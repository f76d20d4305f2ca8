use tezlink_logger::{LogConfig, LogFormat, LogOutput};
use tracing::Level;

/// Deserializes a `[log]`-shaped TOML snippet the way the binaries load it.
fn parse(toml: &str) -> LogConfig {
    config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

#[test]
fn empty_config_uses_defaults() {
    let config = parse("");

    assert_eq!(config, LogConfig::default());
    assert_eq!(config.level, "info");
    assert_eq!(config.output, LogOutput::Stdout);
}

#[test]
fn reads_every_field() {
    let config = parse(
        r#"
        level = "debug"
        format = "json"
        output = "file"
        file-path = "/tmp/tezlink.log"
        "#,
    );

    assert_eq!(config.max_level(), Level::DEBUG);
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.output, LogOutput::File);
    assert_eq!(config.file_path.as_deref(), Some("/tmp/tezlink.log"));
}

#[test]
fn unknown_levels_fall_back_to_info() {
    let config = parse(r#"level = "loud""#);

    assert_eq!(config.max_level(), Level::INFO);
}

#[test]
fn file_output_requires_a_path() {
    let config = LogConfig {
        output: LogOutput::File,
        ..LogConfig::default()
    };

    let err = tezlink_logger::init(&config).unwrap_err();
    assert!(err.to_string().contains("file-path"));
}
