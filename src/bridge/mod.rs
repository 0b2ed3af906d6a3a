//! NATS to Gotify bridge
//!
//! [`NatsBridge`] owns the connection lifecycle for one user. Each enable
//! cycle opens a fresh connection and spawns one background task (see
//! [`subscription::SubscriptionLoop`]) that consumes the configured subject and
//! observes transport events. Disable closes the connection and stops the
//! task; messages already being handled are left to finish.
//!
//! Enable and disable run one at a time: a disable issued while an enable is
//! still connecting waits for it and then closes what it opened. The live
//! connection is only ever swapped out of its slot under the lock and closed
//! outside of it, so `status` never observes a half-torn-down session.

pub mod status;
pub mod subscription;
pub mod translator;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::observability::LogLevelHandle;
use crate::plugin::{Plugin, UserContext};
use crate::sink::MessageSink;
use crate::transport::nats::{
    redact_url, AuthStrategy, ConnectionHealth, ConnectionState, Credentials, SharedHealth,
};
use crate::transport::{Connection, Transport, TransportEvent};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn, Instrument, Span};
use url::Url;

pub use status::{ClientStatus, ConnectionStatus, StatusReporter};
pub use subscription::{MessageOutcome, SubscriptionLoop};
pub use translator::{InboundMessage, MessageTranslator, Notification, TranslationPolicy};

/// Everything owned by one enable cycle
struct Session {
    connection: Arc<dyn Connection>,
    health: SharedHealth,
    shutdown: watch::Sender<bool>,
    auth: AuthStrategy,
    subject: String,
}

impl Session {
    async fn close(self) {
        // The loop may already be gone if its subscription failed
        let _ = self.shutdown.send(true);
        self.connection.close().await;
        self.health.update(|h| h.apply(&TransportEvent::Closed));
    }
}

/// Bridge instance for one user
pub struct NatsBridge {
    user: UserContext,
    span: Span,
    transport: Arc<dyn Transport>,
    sink: Option<Arc<dyn MessageSink>>,
    config: Option<BridgeConfig>,
    log_level: Option<LogLevelHandle>,
    lifecycle: AsyncMutex<()>,
    session: Mutex<Option<Session>>,
}

impl NatsBridge {
    pub fn new(user: UserContext, transport: Arc<dyn Transport>) -> Self {
        let span = crate::bridge_span!(user_id = user.id, user_name = %user.name);

        Self {
            user,
            span,
            transport,
            sink: None,
            config: None,
            log_level: None,
            lifecycle: AsyncMutex::new(()),
            session: Mutex::new(None),
        }
    }

    /// Let the `debug` config flag switch the process log level
    pub fn with_log_level_handle(mut self, handle: LogLevelHandle) -> Self {
        self.log_level = Some(handle);
        self
    }

    pub fn set_message_sink(&mut self, sink: Arc<dyn MessageSink>) {
        self.sink = Some(sink);
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    pub fn config(&self) -> Option<&BridgeConfig> {
        self.config.as_ref()
    }

    /// Snapshot of the current connection, safe to call at any time
    pub fn status(&self) -> ConnectionStatus {
        let slot = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = slot.as_ref() else {
            return ConnectionStatus::no_client();
        };

        ConnectionStatus {
            client: Some(ClientStatus::from_health(
                session.health.snapshot(),
                session.connection.is_closed(),
                session.connection.connected_url_redacted(),
                session.connection.discovered_servers(),
                session.auth,
                session.subject.clone(),
            )),
        }
    }

    fn swap_session(&self, next: Option<Session>) -> Option<Session> {
        let mut slot = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, next)
    }

    async fn close_session(&self) {
        if let Some(session) = self.swap_session(None) {
            debug!("Closing previous NATS connection");
            session.close().await;
        }
    }

    async fn start(&self) -> BridgeResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        info!("Initialising NATS bridge");

        self.close_session().await;

        let config = self
            .config
            .as_ref()
            .ok_or_else(|| BridgeError::not_ready("no configuration has been set"))?;
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| BridgeError::not_ready("no message sink has been set"))?;

        let credentials = Credentials::resolve(config.auth.as_ref())?;
        let auth = credentials.strategy();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let health = SharedHealth::new(ConnectionHealth::connecting());

        info!(
            server = %redact_url(&config.nats_server_url),
            auth = %auth,
            "Connecting to NATS server"
        );
        let connection = match self
            .transport
            .connect(&config.nats_server_url, credentials, events_tx)
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                let error = BridgeError::from(e);
                error!(error = %error, "Failed to connect to NATS");
                return Err(error);
            }
        };
        health.update(|h| h.transition(ConnectionState::Connected));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let subscription = SubscriptionLoop::new(
            connection.clone(),
            config.subject.clone(),
            TranslationPolicy::from(config),
            sink,
            health.clone(),
        );
        tokio::spawn(
            subscription
                .run(events_rx, shutdown_rx)
                .instrument(self.span.clone()),
        );

        let session = Session {
            connection,
            health,
            shutdown: shutdown_tx,
            auth,
            subject: config.subject.clone(),
        };

        if let Some(stale) = self.swap_session(Some(session)) {
            stale.close().await;
        }

        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        debug!("Disabling bridge");
        self.close_session().await;
        Ok(())
    }
}

#[async_trait]
impl Plugin for NatsBridge {
    type Config = BridgeConfig;

    fn default_config(&self) -> BridgeConfig {
        BridgeConfig::default()
    }

    fn validate_and_set_config(&mut self, config: BridgeConfig) -> BridgeResult<()> {
        let _entered = self.span.enter();
        config.validate()?;

        if let Some(handle) = &self.log_level {
            if let Err(e) = handle.set_debug(config.debug) {
                warn!(error = %e, "Failed to change log level");
            }
        }

        info!(
            server = %redact_url(&config.nats_server_url),
            subject = %config.subject,
            auth = %config.auth_strategy(),
            debug = config.debug,
            "Validated configuration"
        );
        self.config = Some(config);
        Ok(())
    }

    async fn enable(&self) -> BridgeResult<()> {
        self.start().instrument(self.span.clone()).await
    }

    async fn disable(&self) -> BridgeResult<()> {
        self.stop().instrument(self.span.clone()).await
    }

    fn display(&self, location: Option<&Url>) -> String {
        if let Some(location) = location {
            debug!(parent: &self.span, location = %location, "Rendering bridge page");
        }
        StatusReporter::render_page(&self.status())
    }
}
