//! Pure connection state management for the NATS client
//!
//! This module holds the connection state machine, the shared health record
//! the status view reads, and URL redaction.

use super::auth::AuthError;
use crate::error::sanitize_error_message;
use crate::transport::TransportEvent;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

const REDACTED: &str = "xxxxx";

/// Connection state for one enable cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, or the connection was closed
    Disabled,
    /// Initial connect in progress
    Connecting,
    /// Connected and subscribed
    Connected,
    /// Transport lost the server and is reconnecting on its own
    Degraded,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disabled => "disabled",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Degraded => "degraded",
        }
    }

    /// Next state after a transport event (pure function).
    ///
    /// Connected and Degraded only move on transport disconnect/reconnect
    /// events; errors never change the state.
    pub fn next(self, event: &TransportEvent) -> ConnectionState {
        match (self, event) {
            (ConnectionState::Disabled, _) => ConnectionState::Disabled,
            (_, TransportEvent::Closed) => ConnectionState::Disabled,
            (_, TransportEvent::Connected) => ConnectionState::Connected,
            (ConnectionState::Connected | ConnectionState::Degraded, TransportEvent::Disconnected) => {
                ConnectionState::Degraded
            }
            (current, _) => current,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NATS transport errors
#[derive(Debug, Error)]
pub enum NatsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid server URL: {0}")]
    InvalidServerUrl(String),
    #[error("Authentication setup failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Connection failed: {0}")]
    ConnectionFailedStr(String),
}

/// Observable health of the live connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionHealth {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub since: DateTime<Utc>,
    pub reconnect_count: u32,
    pub messages_forwarded: u64,
    pub messages_dropped: u64,
}

impl ConnectionHealth {
    pub fn connecting() -> Self {
        Self {
            state: ConnectionState::Connecting,
            last_error: None,
            since: Utc::now(),
            reconnect_count: 0,
            messages_forwarded: 0,
            messages_dropped: 0,
        }
    }

    /// Move to a new state, logging the transition
    pub fn transition(&mut self, to: ConnectionState) {
        if self.state == to {
            return;
        }

        log_state_transition(self.state, to);
        if self.state == ConnectionState::Degraded && to == ConnectionState::Connected {
            self.reconnect_count += 1;
        }
        self.state = to;
        self.since = Utc::now();
    }

    pub fn apply(&mut self, event: &TransportEvent) {
        if let TransportEvent::Error(message) = event {
            self.record_error(message);
        }
        let next = self.state.next(event);
        self.transition(next);
    }

    pub fn record_error(&mut self, message: &str) {
        self.last_error = Some(sanitize_error_message(message));
    }
}

fn log_state_transition(from: ConnectionState, to: ConnectionState) {
    match (from, to) {
        (ConnectionState::Connecting, ConnectionState::Connected) => {
            info!("NATS connection established");
        }
        (ConnectionState::Connected, ConnectionState::Degraded) => {
            warn!("NATS connection lost");
        }
        (ConnectionState::Degraded, ConnectionState::Connected) => {
            info!("Connection to NATS server restored");
        }
        (_, ConnectionState::Disabled) => {
            info!("NATS connection closed");
        }
        _ => {
            info!("NATS connection state: {} -> {}", from, to);
        }
    }
}

/// Health record shared between the control path and the background task
#[derive(Debug, Clone)]
pub struct SharedHealth(Arc<RwLock<ConnectionHealth>>);

impl SharedHealth {
    pub fn new(health: ConnectionHealth) -> Self {
        Self(Arc::new(RwLock::new(health)))
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ConnectionHealth) -> R) -> R {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> ConnectionHealth {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Hide credentials embedded in a server URL or a comma-separated list of them
pub fn redact_url(server_url: &str) -> String {
    server_url
        .split(',')
        .map(|entry| redact_entry(entry.trim()))
        .collect::<Vec<_>>()
        .join(",")
}

fn redact_entry(entry: &str) -> String {
    let schemeless = !entry.contains("://");
    let candidate = if schemeless {
        format!("nats://{entry}")
    } else {
        entry.to_string()
    };
    let Ok(mut url) = Url::parse(&candidate) else {
        return entry.to_string();
    };

    if url.password().is_some() {
        let _ = url.set_password(Some(REDACTED));
    } else if !url.username().is_empty() {
        // A bare user part is a token
        let _ = url.set_username(REDACTED);
    }

    let redacted = url.to_string();
    match redacted.strip_prefix("nats://") {
        Some(rest) if schemeless => rest.to_string(),
        _ => redacted,
    }
}
