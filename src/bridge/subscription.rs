//! Per-cycle background task
//!
//! Owns the subject subscription and the transport event observers. Every
//! payload is translated and forwarded; failures are logged and the message is
//! dropped, the loop keeps consuming.

use super::translator::{MessageTranslator, TranslationPolicy};
use crate::error::{sanitize_error_message, BridgeError};
use crate::sink::MessageSink;
use crate::transport::nats::SharedHealth;
use crate::transport::{Connection, MessageStream, TransportEvent};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn, Instrument};

/// Result of handling one inbound payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Forwarded,
    DecodeFailed,
    ForwardFailed,
}

enum Step {
    Shutdown,
    Event(TransportEvent),
    Message(Option<Bytes>),
    Idle,
}

pub struct SubscriptionLoop {
    connection: Arc<dyn Connection>,
    subject: String,
    policy: TranslationPolicy,
    sink: Arc<dyn MessageSink>,
    health: SharedHealth,
}

impl SubscriptionLoop {
    pub fn new(
        connection: Arc<dyn Connection>,
        subject: String,
        policy: TranslationPolicy,
        sink: Arc<dyn MessageSink>,
        health: SharedHealth,
    ) -> Self {
        Self {
            connection,
            subject,
            policy,
            sink,
            health,
        }
    }

    /// Subscribe, then serve messages and transport events until shutdown
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        debug!(subject = %self.subject, "Listening on subject");

        let mut messages = match self.connection.subscribe(&self.subject).await {
            Ok(stream) => Some(stream),
            Err(e) => {
                error!(subject = %self.subject, error = %e, "Failed to subscribe");
                self.health
                    .update(|h| h.record_error(&format!("subscribe to {}: {e}", self.subject)));
                None
            }
        };

        loop {
            if *shutdown.borrow() {
                break;
            }

            let step = tokio::select! {
                changed = shutdown.changed() => match changed {
                    Ok(()) if !*shutdown.borrow() => Step::Idle,
                    _ => Step::Shutdown,
                },
                Some(event) = events.recv() => Step::Event(event),
                payload = next_payload(&mut messages) => Step::Message(payload),
            };

            match step {
                Step::Shutdown => break,
                Step::Idle => {}
                Step::Event(event) => self.observe(&event),
                Step::Message(Some(payload)) => {
                    let span = crate::message_span!(subject = %self.subject, bytes = payload.len());
                    self.handle_message(&payload).instrument(span).await;
                }
                Step::Message(None) => {
                    info!(subject = %self.subject, "Subscription ended");
                    messages = None;
                }
            }
        }

        debug!(subject = %self.subject, "Stopped listening on subject");
    }

    /// Record a transport event and log it
    pub fn observe(&self, event: &TransportEvent) {
        match event {
            TransportEvent::Error(message) => {
                error!(error = %sanitize_error_message(message), "NATS error occurred");
            }
            TransportEvent::Notice(message) => info!("NATS event: {}", message),
            TransportEvent::Connected | TransportEvent::Disconnected | TransportEvent::Closed => {}
        }
        self.health.update(|h| h.apply(event));
    }

    /// Translate one payload and hand it to the sink
    pub async fn handle_message(&self, payload: &[u8]) -> MessageOutcome {
        debug!(payload = %String::from_utf8_lossy(payload), "Received payload");

        let notification = match MessageTranslator::translate(payload, &self.policy) {
            Ok(notification) => notification,
            Err(e) => {
                error!(error = %e, "Failed to unmarshal incoming message");
                self.health.update(|h| h.messages_dropped += 1);
                return MessageOutcome::DecodeFailed;
            }
        };

        if let Err(e) = self.sink.send_message(notification).await {
            let error = BridgeError::Forward(e);
            warn!(error = %error, "Failed to send the message to gotify");
            self.health.update(|h| h.messages_dropped += 1);
            return MessageOutcome::ForwardFailed;
        }

        self.health.update(|h| h.messages_forwarded += 1);
        MessageOutcome::Forwarded
    }
}

/// Next payload, or pending forever once the subscription is gone
async fn next_payload(messages: &mut Option<MessageStream>) -> Option<Bytes> {
    match messages {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
