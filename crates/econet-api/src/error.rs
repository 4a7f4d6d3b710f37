use thiserror::Error;

/// Top-level error type for the `econet-api` crate.
///
/// Covers every failure mode of the controller's local HTTP surface:
/// authentication, transport, response envelopes and parameter writes.
/// `econet-core` folds these into pipeline-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Basic auth rejected by the controller (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out, after all retry attempts were spent.
    #[error("Request timed out after {attempts} attempt(s) of {timeout_secs}s")]
    Timeout { timeout_secs: u64, attempts: u32 },

    /// Client construction failed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Controller responses ────────────────────────────────────────
    /// Non-success HTTP status other than 401.
    #[error("Controller returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The `{…Ver, data}` envelope came back without a `data` member.
    #[error("Response from {endpoint} has no data member")]
    MissingData { endpoint: String },

    /// A parameter write was answered with something other than `result: OK`.
    #[error("Parameter write rejected: {message}")]
    WriteRejected { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the controller refused our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
