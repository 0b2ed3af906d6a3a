//! Transport layer for the bridge
//!
//! This module provides the transport abstraction and its NATS implementation.
//! The bridge only talks to the traits here, so tests can drive it with
//! [`crate::testing::MockTransport`].

use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::mpsc;

pub mod nats;

use nats::{Credentials, NatsError};

/// Raw payloads received on a subscription
pub type MessageStream = BoxStream<'static, Bytes>;

/// Connection-level events reported by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// (Re)connected to a server
    Connected,
    /// Lost the server; the transport reconnects with its own backoff
    Disconnected,
    /// Asynchronous error reported by the server or client
    Error(String),
    /// Informational notice that does not affect the connection state
    Notice(String),
    /// The connection is closed for good
    Closed,
}

/// Opens connections to a messaging server
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Connect to `server_url`, reporting connection events on `events`
    async fn connect(
        &self,
        server_url: &str,
        credentials: Credentials,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn Connection>, NatsError>;
}

/// A live connection owned by the bridge for one enable cycle
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Subscribe to exactly `subject`
    async fn subscribe(&self, subject: &str) -> Result<MessageStream, NatsError>;

    /// Close the connection. Closing twice is a no-op
    async fn close(&self);

    fn is_closed(&self) -> bool;

    /// Server URL with any credentials masked
    fn connected_url_redacted(&self) -> String;

    /// Peer servers announced by the cluster
    fn discovered_servers(&self) -> Vec<String>;
}

/// Type alias for the production transport
pub type DefaultTransport = nats::NatsTransport;
