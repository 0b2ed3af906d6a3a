//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading, validation, and error handling.

use gotify_nats_bridge::config::{BridgeConfig, ConfigError};
use gotify_nats_bridge::transport::nats::AuthStrategy;
use std::io::Write;
use tempfile::Builder;

fn config_file(extension: &str, content: &str) -> tempfile::NamedTempFile {
    let mut temp_file = Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()
        .unwrap();
    write!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_from_yaml() {
    let temp_file = config_file(
        "yaml",
        r#"
nats_server_url: nats://nats.example.com:4222
subject: home.alerts
default_message_priority: 7
markdown: false
debug: true
auth:
  nkey: SUALLJRV33UOFX7TNHYFXP43YVQDAM4N3FEGP2W62EOHKYA7UFI7GCU6JU
"#,
    );

    let config = BridgeConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.nats_server_url, "nats://nats.example.com:4222");
    assert_eq!(config.subject, "home.alerts");
    assert_eq!(config.default_message_priority, 7);
    assert!(!config.markdown);
    assert!(config.debug);
    assert_eq!(config.auth_strategy(), AuthStrategy::Nkey);
}

#[test]
fn test_config_loads_from_yml_json_and_toml() {
    let yml = config_file("yml", "subject: from-yml\n");
    assert_eq!(
        BridgeConfig::load_from_file(yml.path()).unwrap().subject,
        "from-yml"
    );

    let json = config_file(
        "json",
        r#"{"subject": "from-json", "auth": {"username": "foo", "password": "bar"}}"#,
    );
    let config = BridgeConfig::load_from_file(json.path()).unwrap();
    assert_eq!(config.subject, "from-json");
    assert_eq!(config.auth_strategy(), AuthStrategy::UserPassword);

    let toml = config_file(
        "toml",
        r#"
subject = "from-toml"
default_message_priority = 2

[auth]
token = "s3cr3t"
"#,
    );
    let config = BridgeConfig::load_from_file(toml.path()).unwrap();
    assert_eq!(config.subject, "from-toml");
    assert_eq!(config.default_message_priority, 2);
    assert_eq!(config.auth_strategy(), AuthStrategy::Token);
}

#[test]
fn test_empty_document_uses_defaults() {
    let temp_file = config_file("json", "{}");
    let config = BridgeConfig::load_from_file(temp_file.path()).unwrap();
    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn test_missing_file_is_read_error() {
    let result = BridgeConfig::load_from_file(std::path::Path::new("/nonexistent/bridge.yaml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_unsupported_extension() {
    let temp_file = config_file("ini", "subject=gotify");
    assert!(matches!(
        BridgeConfig::load_from_file(temp_file.path()),
        Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
    ));
}

#[test]
fn test_malformed_documents() {
    let yaml = config_file("yaml", "subject: [unterminated");
    assert!(matches!(
        BridgeConfig::load_from_file(yaml.path()),
        Err(ConfigError::YamlParse(_))
    ));

    let json = config_file("json", r#"{"default_message_priority": "high"}"#);
    assert!(matches!(
        BridgeConfig::load_from_file(json.path()),
        Err(ConfigError::JsonParse(_))
    ));

    let toml = config_file("toml", "subject = ");
    assert!(matches!(
        BridgeConfig::load_from_file(toml.path()),
        Err(ConfigError::TomlParse(_))
    ));
}

#[test]
fn test_loaded_config_is_validated() {
    let temp_file = config_file("yaml", "nats_server_url: http://localhost:4222\n");
    assert!(matches!(
        BridgeConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));

    let temp_file = config_file("yaml", "subject: 'alerts..prod'\n");
    assert!(matches!(
        BridgeConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));

    let temp_file = config_file("yaml", "auth:\n  jwt: eyJ0eXAiOiJKV1QifQ\n");
    assert!(matches!(
        BridgeConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_cluster_url_and_wildcard_subject_load() {
    let temp_file = config_file(
        "yaml",
        "nats_server_url: 'localhost:4222, nats://nats-2:4222'\nsubject: 'alerts.>'\n",
    );

    let config = BridgeConfig::load_from_file(temp_file.path()).unwrap();
    assert_eq!(config.nats_server_url, "localhost:4222, nats://nats-2:4222");
    assert_eq!(config.subject, "alerts.>");
}

#[test]
fn test_config_survives_yaml_round_trip() {
    let config = BridgeConfig {
        subject: "alerts".to_string(),
        markdown: false,
        ..Default::default()
    };
    let yaml = serde_yaml::to_string(&config).unwrap();
    let temp_file = config_file("yaml", &yaml);

    assert_eq!(BridgeConfig::load_from_file(temp_file.path()).unwrap(), config);
}
