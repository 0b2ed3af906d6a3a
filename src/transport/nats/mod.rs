//! NATS transport for the bridge
//!
//! The module is split into three focused sub-modules:
//!
//! - [`auth`] - Credential selection and nonce signing
//! - [`connection`] - Pure connection state management
//! - [`client`] - Impure I/O on top of `async-nats`
//!
//! # Usage
//!
//! ```rust,no_run
//! use gotify_nats_bridge::transport::nats::{Credentials, NatsTransport};
//! use gotify_nats_bridge::transport::Transport;
//!
//! # tokio_test::block_on(async {
//! let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel();
//! let transport = NatsTransport::new();
//! let connection = transport
//!     .connect("nats://localhost:4222", Credentials::Anonymous, events_tx)
//!     .await?;
//! let _messages = connection.subscribe("gotify").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod auth;
pub mod client;
pub mod connection;

pub use auth::{AuthError, AuthStrategy, Credentials, NonceSigner};
pub use client::NatsTransport;
pub use connection::{
    redact_url, ConnectionHealth, ConnectionState, NatsError, SharedHealth,
};
