//! Bridge configuration
//!
//! The host hands the bridge one [`BridgeConfig`] per enable cycle. Every field
//! has a serde default so partial YAML/JSON/TOML documents are accepted.

use crate::transport::nats::auth::AuthStrategy;
use crate::transport::nats::redact_url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Schemes accepted by the NATS client for the server URL
const SUPPORTED_SCHEMES: &[&str] = &["nats", "tls", "ws", "wss"];

/// Main bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// URL of the NATS server to connect to
    #[serde(default = "default_server_url")]
    pub nats_server_url: String,
    /// Subject to listen on for messages
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Priority used when an inbound message does not carry one
    #[serde(default = "default_message_priority")]
    pub default_message_priority: i64,
    /// Render messages as markdown unless a message says otherwise
    #[serde(default = "default_markdown")]
    pub markdown: bool,
    /// Log at debug level while this config is active
    #[serde(default)]
    pub debug: bool,
    /// Authentication settings; omit for an anonymous connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

/// Authentication section. Only one strategy is used; see [`AuthStrategy`]
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Nkey seed, used alone or together with `jwt`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nkey: Option<String>,
    /// User JWT issued by an operator; requires `nkey`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(value: &Option<String>) -> Option<&'static str> {
            value.as_ref().map(|_| "***")
        }

        f.debug_struct("AuthConfig")
            .field("token", &mask(&self.token))
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("nkey", &mask(&self.nkey))
            .field("jwt", &mask(&self.jwt))
            .finish()
    }
}

fn default_server_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_subject() -> String {
    "gotify".to_string()
}

fn default_message_priority() -> i64 {
    5
}

fn default_markdown() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            nats_server_url: default_server_url(),
            subject: default_subject(),
            default_message_priority: default_message_priority(),
            markdown: default_markdown(),
            debug: false,
            auth: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeConfig {
    /// Load configuration from a YAML, JSON or TOML file (chosen by extension)
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let config: BridgeConfig = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the values the connection depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server_url(&self.nats_server_url)?;
        validate_subject(&self.subject)?;

        if let Some(auth) = &self.auth {
            // A lone jwt would silently fall back to an anonymous connection
            if auth.jwt.is_some() && self.auth_strategy() == AuthStrategy::Anonymous {
                return Err(ConfigError::InvalidConfig(
                    "auth.jwt must be used together with auth.nkey".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Strategy the connection will authenticate with
    pub fn auth_strategy(&self) -> AuthStrategy {
        AuthStrategy::select(self.auth.as_ref())
    }
}

fn validate_server_url(server_url: &str) -> Result<(), ConfigError> {
    let entries: Vec<&str> = server_url
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    if entries.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "nats_server_url must name at least one server".to_string(),
        ));
    }

    entries.into_iter().try_for_each(validate_server_entry)
}

/// One server of the list; a bare `host:port` is taken as `nats://`
fn validate_server_entry(entry: &str) -> Result<(), ConfigError> {
    let shown = redact_url(entry);
    let url = if entry.contains("://") {
        Url::parse(entry)
    } else {
        Url::parse(&format!("nats://{entry}"))
    }
    .map_err(|e| {
        ConfigError::InvalidConfig(format!("nats_server_url '{shown}' is not a URL: {e}"))
    })?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(ConfigError::InvalidConfig(format!(
            "nats_server_url scheme '{}' is not one of {SUPPORTED_SCHEMES:?}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidConfig(format!(
            "nats_server_url '{shown}' has no host"
        )));
    }

    Ok(())
}

/// Subjects may use wildcards; tokens must be non-empty
fn validate_subject(subject: &str) -> Result<(), ConfigError> {
    if subject.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "subject must not be empty".to_string(),
        ));
    }

    if subject.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidConfig(format!(
            "subject '{subject}' must not contain whitespace"
        )));
    }

    if subject.split('.').any(str::is_empty) {
        return Err(ConfigError::InvalidConfig(format!(
            "subject '{subject}' has an empty token"
        )));
    }

    Ok(())
}
