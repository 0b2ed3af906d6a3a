//! Gotify NATS bridge
//!
//! Subscribes to a single NATS subject and forwards every JSON message
//! published on it to Gotify as a notification.
//!
//! # Overview
//!
//! - Credential selection for token, username/password, nkey and JWT auth
//! - Connection lifecycle with disconnect/reconnect observation
//! - Lenient decoding of inbound messages into Gotify notifications
//! - A markdown status page for the host UI
//!
//! # Quick Start
//!
//! ```rust
//! use gotify_nats_bridge::bridge::{MessageTranslator, TranslationPolicy};
//! use gotify_nats_bridge::BridgeConfig;
//!
//! let config = BridgeConfig::default();
//! let notification = MessageTranslator::translate(
//!     br#"{"title": "hello world", "message": "this is **the message**"}"#,
//!     &TranslationPolicy::from(&config),
//! )
//! .unwrap();
//!
//! assert_eq!(notification.priority, 5);
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod observability;
pub mod plugin;
pub mod sink;
pub mod testing;
pub mod transport;

pub use bridge::{ConnectionStatus, NatsBridge, Notification, StatusReporter};
pub use config::{AuthConfig, BridgeConfig, ConfigError};
pub use error::{BridgeError, BridgeResult};
pub use plugin::{plugin_info, Plugin, PluginInfo, UserContext};
pub use sink::{GotifySink, GotifySinkConfig, LogSink, MessageSink, SinkError};
pub use transport::nats::NatsTransport;
