//! Host-facing plugin surface
//!
//! The host creates one bridge per user, hands it a configuration and a
//! message sink, and then drives it through enable/disable cycles.

use crate::error::BridgeResult;
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

/// Static plugin metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub module_path: &'static str,
    pub version: &'static str,
    pub author: &'static str,
    pub website: &'static str,
    pub description: &'static str,
    pub license: &'static str,
    pub name: &'static str,
}

pub fn plugin_info() -> PluginInfo {
    PluginInfo {
        module_path: module_path!(),
        version: env!("CARGO_PKG_VERSION"),
        author: env!("CARGO_PKG_AUTHORS"),
        website: env!("CARGO_PKG_REPOSITORY"),
        description: "NATS plugin: send messages to Gotify through NATS",
        license: env!("CARGO_PKG_LICENSE"),
        name: "NATS plugin",
    }
}

/// User the bridge instance belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub id: u64,
    pub name: String,
}

impl UserContext {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Lifecycle the host drives a plugin through
#[async_trait]
pub trait Plugin: Send + Sync {
    type Config;

    fn default_config(&self) -> Self::Config;

    /// Validate a configuration and keep it for the next enable
    fn validate_and_set_config(&mut self, config: Self::Config) -> BridgeResult<()>;

    async fn enable(&self) -> BridgeResult<()>;

    /// Safe to call at any time, including when already disabled
    async fn disable(&self) -> BridgeResult<()>;

    /// Markdown page for the host UI
    fn display(&self, location: Option<&Url>) -> String;
}
