//! Testing utilities and mock implementations
//!
//! Mocks for the transport and the sink, so the bridge can be exercised
//! without a NATS server or a Gotify instance.

pub mod mocks;

pub use mocks::*;
