//! Structured logging system using tracing crate
//!
//! Provides contextual, machine-readable logging with span macros for the
//! bridge lifecycle and per-message handling.
//!
//! ## Log Format Options
//!
//! The logging system supports three output formats controlled by the `LOG_FORMAT` environment variable:
//!
//! - `json` - Structured JSON format for production and log aggregation systems
//! - `pretty` - Human-readable format with colors and indentation for development
//! - `compact` - Terminal-friendly format with colors but minimal spacing
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: Log level (ERROR, WARN, INFO, DEBUG, TRACE) - defaults to INFO
//! - `LOG_FORMAT`: Output format (json, pretty, compact) - defaults to json
//! - `LOG_SPANS`: Include span events (true/false) - defaults to false
//! - `RUST_LOG`: Override log filtering (follows env_logger format)
//!
//! The level can be raised to DEBUG at runtime through [`LogLevelHandle`],
//! which the bridge uses when a configuration sets `debug: true`. A `RUST_LOG`
//! override always wins over both.
//!
//! ## Examples
//!
//! ```bash
//! # Production JSON logging
//! LOG_FORMAT=json LOG_LEVEL=INFO ./gotify-nats-bridge run -c bridge.yaml
//!
//! # Development with colors
//! LOG_FORMAT=pretty LOG_LEVEL=DEBUG ./gotify-nats-bridge run -c bridge.yaml
//! ```

use std::env;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Dependencies that are too chatty at the bridge's own level
const QUIET_DEPENDENCIES: &[&str] = &["async_nats=warn", "hyper=warn", "reqwest=warn"];

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for structured logging (machine-readable)
    Json,
    /// Pretty format with colors and indentation (human-readable)
    Pretty,
    /// Compact format with colors but minimal spacing (terminal-friendly)
    Compact,
}

impl LogFormat {
    /// Parse log format from string
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Logging is already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
    #[error("Failed to reload log filter: {0}")]
    Reload(#[from] reload::Error),
}

/// Parse a log level name, falling back to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "INFO" => Level::INFO,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Build the filter for `level`. An override (from `RUST_LOG`) replaces it entirely
pub fn build_filter(level: Level, override_filter: Option<&str>) -> Result<EnvFilter, LoggingError> {
    if let Some(directives) = override_filter {
        return EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter(e.to_string()));
    }

    let mut filter = EnvFilter::new(level.to_string());
    for directive in QUIET_DEPENDENCIES {
        let directive = directive
            .parse::<Directive>()
            .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

/// Runtime control over the active log filter
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    base_level: Level,
    override_filter: Option<String>,
}

impl LogLevelHandle {
    /// Create a reloadable filter layer and the handle that controls it
    pub fn with_layer(
        base_level: Level,
        override_filter: Option<String>,
    ) -> Result<(Self, reload::Layer<EnvFilter, Registry>), LoggingError> {
        let filter = build_filter(base_level, override_filter.as_deref())?;
        let (layer, handle) = reload::Layer::new(filter);

        Ok((
            Self {
                handle,
                base_level,
                override_filter,
            },
            layer,
        ))
    }

    /// Switch between DEBUG and the level logging was started with
    pub fn set_debug(&self, debug: bool) -> Result<(), LoggingError> {
        let level = if debug { Level::DEBUG } else { self.base_level };
        let filter = build_filter(level, self.override_filter.as_deref())?;
        self.handle.reload(filter)?;
        Ok(())
    }

    /// Active filter directives, if the subscriber is still alive
    pub fn current_filter(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

impl std::fmt::Debug for LogLevelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogLevelHandle")
            .field("base_level", &self.base_level)
            .field("filter", &self.current_filter())
            .finish()
    }
}

fn span_events(include_spans: bool) -> fmt::format::FmtSpan {
    if include_spans {
        fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
    } else {
        fmt::format::FmtSpan::NONE
    }
}

/// Initialize logging with manual configuration
pub fn init_logging(
    level: Level,
    format: LogFormat,
    include_spans: bool,
) -> Result<LogLevelHandle, LoggingError> {
    let (handle, filter_layer) = LogLevelHandle::with_layer(level, env::var("RUST_LOG").ok())?;
    let subscriber = tracing_subscriber::registry().with(filter_layer);

    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_span_events(span_events(include_spans));
            subscriber.with(fmt_layer).try_init()?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_ansi(true)
                .with_span_events(span_events(include_spans));
            subscriber.with(fmt_layer).try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_ansi(true)
                .with_target(false)
                .with_span_events(span_events(include_spans));
            subscriber.with(fmt_layer).try_init()?;
        }
    }

    Ok(handle)
}

/// Initialize logging from environment variables
pub fn init_default_logging() -> Result<LogLevelHandle, LoggingError> {
    let level = parse_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()));

    let format = env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let log_format = LogFormat::parse(&format);

    let include_spans = env::var("LOG_SPANS")
        .unwrap_or_else(|_| "false".to_string())
        .to_lowercase()
        == "true";

    init_logging(level, log_format, include_spans)
}

/// Create the long-lived span of one bridge instance
#[macro_export]
macro_rules! bridge_span {
    ($($field:tt)*) => {
        tracing::info_span!("nats_bridge", $($field)*)
    };
}

/// Create a span around the handling of one inbound message
#[macro_export]
macro_rules! message_span {
    ($($field:tt)*) => {
        tracing::debug_span!("nats_message", $($field)*)
    };
}

// Re-export macros for convenience
pub use {bridge_span, message_span};
