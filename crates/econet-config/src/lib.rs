//! Shared configuration for ecoNET-300 hosts.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `econet_core::DeviceConfig` and
//! `econet_core::CoordinatorConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use econet_core::config::{
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_LANG, DEFAULT_POLL_INTERVAL, resolve_lang,
};
use econet_core::{CoordinatorConfig, DeviceConfig, PipelineOptions};

const KEYRING_SERVICE: &str = "econet";
const PASSWORD_ENV: &str = "ECONET_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

fn default_lang() -> String {
    DEFAULT_LANG.into()
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    15
}
fn default_max_attempts() -> u32 {
    5
}
fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

/// A named controller profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller address, with or without scheme (e.g. "192.168.1.50").
    pub host: String,

    /// Username for HTTP basic auth.
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Device uid; discovered on connect when unset.
    pub uid: Option<String>,

    /// Override remote-menu language.
    pub lang: Option<String>,

    /// Override poll interval (seconds).
    pub poll_interval: Option<u64>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    pub max_attempts: Option<u32>,

    /// Keep locked parameters visible as read-only sensors.
    pub show_locked_as_sensors: Option<bool>,

    /// Resolve lock reason text for locked parameters.
    pub include_lock_reasons: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "econet", "econet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("econet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. `ECONET_`-prefixed variables override file
/// values; nested keys use `__` (e.g. `ECONET_DEFAULTS__LANG=pl`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ECONET_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "loaded config");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick `name`, else the configured default profile.
pub fn select_profile<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> Result<(&'a str, &'a Profile), ConfigError> {
    let wanted = name
        .or(config.default_profile.as_deref())
        .unwrap_or("default");
    config
        .profiles
        .get_key_value(wanted)
        .map(|(k, p)| (k.as_str(), p))
        .ok_or_else(|| ConfigError::UnknownProfile {
            profile: wanted.into(),
        })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the password: profile env var, then `ECONET_PASSWORD`, then
/// the system keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var
    let env_names = profile.password_env.as_deref().into_iter().chain([PASSWORD_ENV]);
    for env_name in env_names {
        if let Ok(pw) = std::env::var(env_name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Accept bare hosts by assuming plain HTTP, which is what the
/// controller serves on the LAN.
fn controller_url(host: &str) -> Result<url::Url, ConfigError> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }
    let candidate = if host.contains("://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    };
    candidate.parse().map_err(|_| ConfigError::Validation {
        field: "host".into(),
        reason: format!("invalid URL: {host}"),
    })
}

// ── Translation to core config ──────────────────────────────────────

/// Build the transport settings for a profile.
pub fn profile_to_device_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    let mut device = DeviceConfig::new(controller_url(&profile.host)?);

    if let Some(ref username) = profile.username {
        device.username = Some(username.clone());
        device.password = Some(resolve_password(profile, profile_name)?);
    }

    device.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    device.max_attempts = profile.max_attempts.unwrap_or(defaults.max_attempts).max(1);
    Ok(device)
}

/// Build the polling and pipeline settings for a profile.
pub fn profile_to_coordinator_config(profile: &Profile, defaults: &Defaults) -> CoordinatorConfig {
    let pipeline = PipelineOptions::default();
    let lang = profile.lang.as_deref().unwrap_or(&defaults.lang);

    CoordinatorConfig {
        uid: profile.uid.clone(),
        lang: resolve_lang(Some(lang)).into(),
        poll_interval: Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval)),
        failure_threshold: defaults.failure_threshold.max(1),
        pipeline: PipelineOptions {
            show_locked_as_sensors: profile
                .show_locked_as_sensors
                .unwrap_or(pipeline.show_locked_as_sensors),
            include_lock_reasons: profile
                .include_lock_reasons
                .unwrap_or(pipeline.include_lock_reasons),
        },
    }
}
