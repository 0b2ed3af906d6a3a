//! Mock implementations for testing
//!
//! Provides mock Transport, Connection and MessageSink implementations to
//! drive the bridge without a NATS server or a Gotify instance.

use crate::bridge::translator::Notification;
use crate::sink::{MessageSink, SinkError};
use crate::transport::nats::{redact_url, AuthStrategy, Credentials, NatsError};
use crate::transport::{Connection, MessageStream, Transport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock transport for testing
#[derive(Debug, Default)]
pub struct MockTransport {
    should_fail: bool,
    fail_subscribe: bool,
    discovered_servers: Vec<String>,
    connect_delay: Option<Duration>,
    strategies: Mutex<Vec<AuthStrategy>>,
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect attempt fails
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Connections accept the connect but refuse the subscription
    pub fn with_subscribe_failure() -> Self {
        Self {
            fail_subscribe: true,
            ..Default::default()
        }
    }

    pub fn with_discovered_servers(mut self, servers: Vec<String>) -> Self {
        self.discovered_servers = servers;
        self
    }

    /// Each connect attempt takes this long to complete
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Strategies of the credentials passed to each connect attempt
    pub fn credential_strategies(&self) -> Vec<AuthStrategy> {
        lock(&self.strategies).clone()
    }

    /// Connections opened so far, oldest first
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        lock(&self.connections).clone()
    }

    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        lock(&self.connections).last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        server_url: &str,
        credentials: Credentials,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn Connection>, NatsError> {
        lock(&self.strategies).push(credentials.strategy());

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(NatsError::ConnectionFailedStr(format!(
                "mock connection to {} refused",
                redact_url(server_url)
            )));
        }

        let mut connection = MockConnection::new(server_url);
        connection.discovered_servers = self.discovered_servers.clone();
        connection.fail_subscribe = self.fail_subscribe;
        *lock(&connection.events) = Some(events);

        let connection = Arc::new(connection);
        lock(&self.connections).push(connection.clone());
        Ok(connection)
    }
}

/// Mock connection with injectable messages and transport events
#[derive(Debug)]
pub struct MockConnection {
    server_url: String,
    closed: AtomicBool,
    fail_subscribe: bool,
    discovered_servers: Vec<String>,
    subscriptions: Mutex<Vec<String>>,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

impl MockConnection {
    pub fn new(server_url: &str) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Self {
            server_url: redact_url(server_url),
            closed: AtomicBool::new(false),
            fail_subscribe: false,
            discovered_servers: Vec::new(),
            subscriptions: Mutex::new(Vec::new()),
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            events: Mutex::new(None),
        }
    }

    /// Deliver a payload on the subscription. Returns false once closed
    pub fn publish(&self, payload: impl Into<Bytes>) -> bool {
        match lock(&self.inbound_tx).as_ref() {
            Some(sender) => sender.send(payload.into()).is_ok(),
            None => false,
        }
    }

    /// Report a transport event to the bridge. `Closed` also marks the
    /// connection closed, as the client does when it gives up reconnecting
    pub fn emit_event(&self, event: TransportEvent) -> bool {
        if event == TransportEvent::Closed {
            self.closed.store(true, Ordering::SeqCst);
        }
        match lock(&self.events).as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Subjects subscribed to, in order
    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.subscriptions).clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn subscribe(&self, subject: &str) -> Result<MessageStream, NatsError> {
        lock(&self.subscriptions).push(subject.to_string());

        if self.fail_subscribe {
            return Err(NatsError::SubscriptionFailed(
                format!("permissions violation for subscription to {subject}").into(),
            ));
        }

        let receiver = lock(&self.inbound_rx).take().ok_or_else(|| {
            NatsError::SubscriptionFailed("mock connection supports one subscription".into())
        })?;

        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|payload| (payload, receiver))
        });
        Ok(stream.boxed())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Ends the message stream
        lock(&self.inbound_tx).take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn connected_url_redacted(&self) -> String {
        self.server_url.clone()
    }

    fn discovered_servers(&self) -> Vec<String> {
        self.discovered_servers.clone()
    }
}

/// Sink that records every notification it is handed
#[derive(Debug, Clone)]
pub struct RecordingSink {
    sender: mpsc::UnboundedSender<Notification>,
    rejected_titles: Vec<String>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                rejected_titles: Vec::new(),
            },
            receiver,
        )
    }

    /// Record everything, but fail notifications with this title
    pub fn rejecting_title(title: &str) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (mut sink, receiver) = Self::new();
        sink.rejected_titles.push(title.to_string());
        (sink, receiver)
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_message(&self, notification: Notification) -> Result<(), SinkError> {
        let rejected = self.rejected_titles.contains(&notification.title);
        let _ = self.sender.send(notification);

        if rejected {
            return Err(SinkError::Rejected {
                status: 500,
                body: "rejected by recording sink".to_string(),
            });
        }
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
