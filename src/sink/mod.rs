//! Notification sinks
//!
//! A sink receives every translated [`Notification`]. Failures are reported
//! back to the subscription loop, which logs them and moves on.

use crate::bridge::translator::Notification;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub mod gotify;

pub use gotify::{GotifySink, GotifySinkConfig};

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gotify rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid sink URL: {0}")]
    InvalidUrl(String),
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Downstream consumer of notifications
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_message(&self, notification: Notification) -> Result<(), SinkError>;
}

/// Sink that only logs notifications, for dry runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl MessageSink for LogSink {
    async fn send_message(&self, notification: Notification) -> Result<(), SinkError> {
        info!(
            title = %notification.title,
            priority = notification.priority,
            content_type = notification.extras.display.map(|d| d.content_type.as_mime()),
            "Notification (dry run): {}",
            notification.message
        );
        Ok(())
    }
}
