//! Error types for the bridge
//!
//! Control-path errors (`Config`, `AuthDerivation`, `Connect`) are returned to
//! the host. Per-message errors (`Decode`, `Forward`) are logged and the message
//! is dropped; they never end a subscription.

use crate::config::ConfigError;
use crate::sink::SinkError;
use crate::transport::nats::{AuthError, NatsError};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bridge is not ready: {message}")]
    NotReady { message: String },

    #[error("Authentication setup failed: {0}")]
    AuthDerivation(#[from] AuthError),

    #[error("Failed to connect to NATS: {0}")]
    Connect(#[source] NatsError),

    #[error("Failed to decode inbound message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to forward notification: {0}")]
    Forward(#[from] SinkError),
}

impl From<NatsError> for BridgeError {
    fn from(error: NatsError) -> Self {
        match error {
            NatsError::Auth(auth) => BridgeError::AuthDerivation(auth),
            other => BridgeError::Connect(other),
        }
    }
}

impl BridgeError {
    /// Create a not-ready error
    pub fn not_ready<S: Into<String>>(message: S) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    /// Per-message failures are recoverable: the message is dropped and the
    /// subscription keeps running
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BridgeError::Decode(_) | BridgeError::Forward(_))
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret|jwt)[=:]\s*\S+").expect("valid secret pattern")
});

// Nkey seeds are 58 base32 characters starting with 'S'
static SEED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bS[A-Z][A-Z2-7]{56}\b").expect("valid seed pattern"));

const MAX_MESSAGE_LEN: usize = 500;

/// Sanitize error messages before they reach logs or the status page
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let mut sanitized = SEED_PATTERN
        .replace_all(&sanitized, "S***REDACTED***")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_sanitization() {
        let sanitized =
            sanitize_error_message("Failed to authenticate: password=secret123 token=abc456");

        assert!(!sanitized.contains("secret123"));
        assert!(!sanitized.contains("abc456"));
        assert!(sanitized.contains("password=***"));
        assert!(sanitized.contains("token=***"));
    }

    #[test]
    fn test_seed_redaction() {
        let seed = "SUALLJRV33UOFX7TNHYFXP43YVQDAM4N3FEGP2W62EOHKYA7UFI7GCU6JU";
        let sanitized = sanitize_error_message(&format!("bad seed {seed} supplied"));

        assert!(!sanitized.contains(seed));
        assert!(sanitized.contains("S***REDACTED***"));
    }

    #[test]
    fn test_long_message_truncation() {
        let sanitized = sanitize_error_message(&"x".repeat(600));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let sanitized = sanitize_error_message(&"é".repeat(400));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_sanitize_exactly_500_chars() {
        let sanitized = sanitize_error_message(&"x".repeat(500));
        assert_eq!(sanitized.len(), 500);
        assert!(!sanitized.contains("truncated"));
    }

    #[test]
    fn test_sanitize_case_insensitive_with_colons() {
        let sanitized = sanitize_error_message("PASSWORD: secret123 Token=abc");
        assert!(!sanitized.contains("secret123"));
        assert!(!sanitized.contains("abc"));
    }

    #[test]
    fn test_nats_auth_error_maps_to_auth_derivation() {
        let error: BridgeError =
            NatsError::Auth(AuthError::SeedDerivation("invalid prefix".to_string())).into();
        assert!(matches!(error, BridgeError::AuthDerivation(_)));

        let error: BridgeError = NatsError::ConnectionFailedStr("refused".to_string()).into();
        assert!(matches!(error, BridgeError::Connect(_)));
    }

    #[test]
    fn test_recoverable_errors() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(BridgeError::Decode(decode).is_recoverable());
        assert!(BridgeError::Forward(SinkError::Unavailable("down".to_string())).is_recoverable());

        assert!(!BridgeError::not_ready("no sink").is_recoverable());
        assert!(
            !BridgeError::Connect(NatsError::ConnectionFailedStr("x".to_string())).is_recoverable()
        );
    }

    #[test]
    fn test_not_ready_display() {
        let error = BridgeError::not_ready("no configuration set");
        assert_eq!(
            error.to_string(),
            "Bridge is not ready: no configuration set"
        );
    }
}
