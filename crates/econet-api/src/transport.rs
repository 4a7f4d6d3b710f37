// Shared transport configuration for building reqwest::Client instances.
//
// Timeout, retry budget and user agent live here so the client module
// stays focused on URL construction and envelope handling.

use std::time::Duration;

use crate::error::Error;

/// Per-request timeout used by the controller's own web UI.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Attempts made for a request that keeps timing out.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Total attempts per request when the controller times out (min 1).
    pub max_attempts: u32,
    /// Pause between timed-out attempts.
    pub retry_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("econet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    /// Attempts actually made, never fewer than one.
    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
