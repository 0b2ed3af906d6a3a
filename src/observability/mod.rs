//! Observability for the bridge
//!
//! Structured logging setup and the span macros used across the crate.

pub mod logging;

// Re-export for convenience
pub use logging::{
    build_filter, init_default_logging, init_logging, parse_level, LogFormat, LogLevelHandle,
    LoggingError,
};

// Span macros for structured logging
pub use logging::{bridge_span, message_span};
