// ── Runtime configuration ──
//
// How to reach a controller and how the pipeline should treat its
// parameters. Never touches disk: econet-config (or any other host)
// builds a `CoordinatorConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use econet_api::{BasicCredentials, EconetClient, TransportConfig};

use crate::error::CoreError;

/// Languages the controller serves remote-menu text in.
pub const SUPPORTED_LANGS: &[&str] = &["en", "pl"];
pub const DEFAULT_LANG: &str = "en";

/// Poll interval used by the controller's own integration.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Fully failed cycles before the connection is flagged for repair.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Map a requested language onto one the controller serves.
pub fn resolve_lang(requested: Option<&str>) -> &'static str {
    requested
        .map(|l| l.trim().to_ascii_lowercase())
        .and_then(|l| SUPPORTED_LANGS.iter().copied().find(|s| *s == l))
        .unwrap_or(DEFAULT_LANG)
}

/// Pipeline behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Locked editable parameters become read-only sensors instead of
    /// being suppressed for the cycle.
    pub show_locked_as_sensors: bool,
    /// Resolve lock reason text from `rmLocksNames`.
    pub include_lock_reasons: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            show_locked_as_sensors: true,
            include_lock_reasons: true,
        }
    }
}

/// Where the controller lives and how to authenticate.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Controller root, e.g. `http://192.168.1.50`.
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub timeout: Duration,
    /// Attempts per request when the controller times out.
    pub max_attempts: u32,
}

impl DeviceConfig {
    pub fn new(url: Url) -> Self {
        let transport = TransportConfig::default();
        Self {
            url,
            username: None,
            password: None,
            timeout: transport.timeout,
            max_attempts: transport.max_attempts,
        }
    }

    /// Build the HTTP transport for this device.
    pub fn build_client(&self) -> Result<EconetClient, CoreError> {
        let credentials = match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(BasicCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(CoreError::Config {
                    message: "username and password must be set together".into(),
                });
            }
        };
        let transport = TransportConfig {
            timeout: self.timeout,
            max_attempts: self.max_attempts,
            ..TransportConfig::default()
        };
        Ok(EconetClient::new(self.url.clone(), credentials, &transport)?)
    }
}

/// Configuration for one coordinator instance.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Device uid; discovered from `sysParams` on connect when absent.
    pub uid: Option<String>,
    /// Remote-menu language; normalized through [`resolve_lang`].
    pub lang: String,
    /// Background poll interval. Zero disables the poll task.
    pub poll_interval: Duration,
    /// Consecutive fully failed cycles before repair is requested.
    pub failure_threshold: u32,
    pub pipeline: PipelineOptions,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            uid: None,
            lang: DEFAULT_LANG.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            pipeline: PipelineOptions::default(),
        }
    }
}
