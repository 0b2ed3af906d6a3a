//! Gotify REST sink
//!
//! Posts notifications to `POST {base_url}/message`, authenticated with an
//! application token in the `X-Gotify-Key` header.

use super::{MessageSink, SinkError};
use crate::bridge::translator::Notification;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

const GOTIFY_KEY_HEADER: &str = "X-Gotify-Key";

/// Gotify sink configuration
#[derive(Debug, Clone)]
pub struct GotifySinkConfig {
    /// Gotify server base URL, e.g. `https://gotify.example.com`
    pub base_url: String,
    /// Application token
    pub app_token: String,
    pub timeout: Duration,
}

impl Default for GotifySinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:80".to_string(),
            app_token: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Sink that creates Gotify messages over HTTP
#[derive(Debug, Clone)]
pub struct GotifySink {
    client: Client,
    endpoint: Url,
    app_token: String,
}

impl GotifySink {
    pub fn new(config: GotifySinkConfig) -> Result<Self, SinkError> {
        if config.app_token.is_empty() {
            return Err(SinkError::Unavailable(
                "a Gotify application token is required".to_string(),
            ));
        }

        let endpoint = message_endpoint(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            app_token: config.app_token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Resolve `{base}/message`, keeping any path prefix on the base URL
fn message_endpoint(base_url: &str) -> Result<Url, SinkError> {
    let mut base = Url::parse(base_url).map_err(|e| SinkError::InvalidUrl(format!("{base_url}: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join("message")
        .map_err(|e| SinkError::InvalidUrl(format!("{base_url}: {e}")))
}

#[async_trait]
impl MessageSink for GotifySink {
    async fn send_message(&self, notification: Notification) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(GOTIFY_KEY_HEADER, &self.app_token)
            .json(&notification)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(title = %notification.title, "Notification delivered to Gotify");
        Ok(())
    }
}
