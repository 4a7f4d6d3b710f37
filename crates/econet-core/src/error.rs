// ── Core error types ──
//
// Errors surfaced to consumers of econet-core. Per-record problems
// (validation rejections, classification anomalies) are not errors:
// they are reported as values in the cycle report. The
// `From<econet_api::Error>` impl folds transport failures in here.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach controller: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Controller request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Every endpoint fetch failed ({consecutive_failures} consecutive cycle(s))")]
    AllEndpointsFailed { consecutive_failures: u32 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed {endpoint} response: {reason}")]
    MalformedData { endpoint: String, reason: String },

    #[error("Unknown parameter: {key}")]
    UnknownParameter { key: String },

    // ── Write errors ─────────────────────────────────────────────────
    #[error("Parameter {key} is locked: {reason}")]
    LockedWrite { key: String, reason: String },

    #[error("Parameter {key} has no structure number and cannot be written")]
    Unbound { key: String },

    #[error("Parameter {key} is read-only")]
    ReadOnly { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Write rejected by controller: {message}")]
    Rejected { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },
}

impl CoreError {
    /// Returns `true` for failures a later poll cycle may clear on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::AllEndpointsFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<econet_api::Error> for CoreError {
    fn from(err: econet_api::Error) -> Self {
        match err {
            econet_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            econet_api::Error::Timeout { timeout_secs, .. } => CoreError::Timeout { timeout_secs },
            econet_api::Error::Transport(ref e) if e.is_timeout() => {
                CoreError::Timeout { timeout_secs: 0 }
            }
            econet_api::Error::Transport(ref e) if e.is_connect() => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            econet_api::Error::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            econet_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid controller URL: {e}"),
            },
            econet_api::Error::ClientBuild(message) => CoreError::Config { message },
            econet_api::Error::Http { status, body } => CoreError::Api {
                message: body,
                status: Some(status),
            },
            econet_api::Error::MissingData { endpoint } => CoreError::MalformedData {
                endpoint,
                reason: "no data member".into(),
            },
            econet_api::Error::Deserialization { message, .. } => CoreError::MalformedData {
                endpoint: "response".into(),
                reason: message,
            },
            econet_api::Error::WriteRejected { message } => CoreError::Rejected { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_auth_maps_to_authentication_failed() {
        let err: CoreError = econet_api::Error::Authentication {
            message: "nope".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn api_timeout_is_transient() {
        let err: CoreError = econet_api::Error::Timeout {
            timeout_secs: 15,
            attempts: 5,
        }
        .into();
        assert!(matches!(err, CoreError::Timeout { timeout_secs: 15 }));
        assert!(err.is_transient());
    }

    #[test]
    fn write_rejection_keeps_message() {
        let err: CoreError = econet_api::Error::WriteRejected {
            message: "result=ERROR".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Write rejected by controller: result=ERROR");
    }
}
