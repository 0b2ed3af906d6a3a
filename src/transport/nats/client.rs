//! Impure I/O operations for the NATS client
//!
//! Wraps `async-nats`: connects with resolved credentials, forwards client
//! events into the bridge's event channel and exposes subscriptions as plain
//! payload streams.

use super::auth::Credentials;
use super::connection::{redact_url, NatsError};
use crate::transport::{Connection, MessageStream, Transport, TransportEvent};
use async_nats::{Client, Event, ServerAddr};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const DEFAULT_CLIENT_NAME: &str = "gotify-nats-bridge";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Production transport backed by `async-nats`
#[derive(Debug, Clone)]
pub struct NatsTransport {
    client_name: String,
    connect_timeout: Duration,
}

impl NatsTransport {
    pub fn new() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for NatsTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a client event onto the transport-neutral event type
fn map_event(event: Event) -> TransportEvent {
    match event {
        Event::Connected => TransportEvent::Connected,
        Event::Disconnected => TransportEvent::Disconnected,
        Event::ServerError(err) => TransportEvent::Error(format!("server error: {err}")),
        Event::ClientError(err) => TransportEvent::Error(format!("client error: {err}")),
        Event::SlowConsumer(sid) => {
            TransportEvent::Error(format!("slow consumer on subscription {sid}"))
        }
        Event::Closed => TransportEvent::Closed,
        other => TransportEvent::Notice(other.to_string()),
    }
}

/// Map an event, marking the connection closed when the client gives up on it
fn record_event(event: Event, closed: &AtomicBool) -> TransportEvent {
    let event = map_event(event);
    if event == TransportEvent::Closed {
        closed.store(true, Ordering::SeqCst);
    }
    event
}

/// Split a comma-separated server list into addresses. Entries without a
/// scheme are taken as `nats://`
fn parse_server_addrs(server_url: &str) -> Result<Vec<ServerAddr>, NatsError> {
    let addrs = server_url
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<ServerAddr>()
                .map_err(|e| NatsError::InvalidServerUrl(format!("{}: {e}", redact_url(entry))))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if addrs.is_empty() {
        return Err(NatsError::InvalidServerUrl("no server address".to_string()));
    }
    Ok(addrs)
}

#[async_trait]
impl Transport for NatsTransport {
    async fn connect(
        &self,
        server_url: &str,
        credentials: Credentials,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn Connection>, NatsError> {
        let addrs = parse_server_addrs(server_url)?;
        let closed = Arc::new(AtomicBool::new(false));
        let closed_by_client = closed.clone();

        let options = credentials
            .into_connect_options()?
            .name(&self.client_name)
            .connection_timeout(self.connect_timeout)
            .event_callback(move |event| {
                let events = events.clone();
                let event = record_event(event, &closed_by_client);
                async move {
                    // The receiver is gone once the bridge is disabled
                    let _ = events.send(event);
                }
            });

        debug!(server = %redact_url(server_url), "Connecting to NATS");
        let client = options
            .connect(addrs.as_slice())
            .await
            .map_err(|e| NatsError::ConnectionFailed(Box::new(e)))?;

        Ok(Arc::new(NatsConnection {
            client: Mutex::new(Some(client)),
            closed,
            server_url: redact_url(server_url),
        }))
    }
}

/// Live `async-nats` connection
struct NatsConnection {
    client: Mutex<Option<Client>>,
    closed: Arc<AtomicBool>,
    server_url: String,
}

impl NatsConnection {
    fn client(&self) -> Option<Client> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Connection for NatsConnection {
    async fn subscribe(&self, subject: &str) -> Result<MessageStream, NatsError> {
        let client = self
            .client()
            .ok_or_else(|| NatsError::ConnectionFailedStr("connection is closed".to_string()))?;

        let subscriber = client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| NatsError::SubscriptionFailed(Box::new(e)))?;

        Ok(subscriber.map(|message| message.payload).boxed())
    }

    async fn close(&self) {
        let already_closed = self.closed.swap(true, Ordering::SeqCst);

        let client = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        // Dropping the last client handle shuts the connection down. Nothing
        // is left to flush once the client has closed on its own
        if let Some(client) = client.filter(|_| !already_closed) {
            match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, client.flush()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Flush before close failed: {}", e),
                Err(_) => debug!("Flush before close timed out"),
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn connected_url_redacted(&self) -> String {
        self.server_url.clone()
    }

    fn discovered_servers(&self) -> Vec<String> {
        self.client()
            .map(|client| client.server_info().connect_urls)
            .unwrap_or_default()
    }
}
