//! Shared configuration for hechte.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `hechte_core::ClientConfig`. The CLI adds
//! flag-aware overrides on top.

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

use hechte_core::{
    ClientConfig, DEFAULT_FREQUENCY_SECS, OverlapPolicy, PollerConfig, SupersededPolicy, Timeline,
};

/// Keyring service name; entries are keyed `{profile}/password`.
pub const KEYRING_SERVICE: &str = "hechte";

/// Environment variable checked first for the account password.
pub const PASSWORD_ENV: &str = "HECHTE_PASSWORD";

/// Environment variable consulted when a profile names no username.
pub const USERNAME_ENV: &str = "HECHTE_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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

    /// Named account profiles.
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
    /// Timeline polled when `watch` starts.
    #[serde(default = "default_timeline")]
    pub timeline: Timeline,

    /// Seconds between polls.
    #[serde(default = "default_frequency")]
    pub frequency: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub overlap: OverlapPolicy,

    #[serde(default)]
    pub superseded: SupersededPolicy,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeline: default_timeline(),
            frequency: default_frequency(),
            timeout: default_timeout(),
            color: default_color(),
            overlap: OverlapPolicy::default(),
            superseded: SupersededPolicy::default(),
        }
    }
}

fn default_timeline() -> Timeline {
    Timeline::Friends
}
fn default_frequency() -> u64 {
    DEFAULT_FREQUENCY_SECS
}
fn default_timeout() -> u64 {
    30
}
fn default_color() -> String {
    "auto".into()
}

/// A named account profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Service root (e.g., "https://twitter.com").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Override the default timeline.
    pub timeline: Option<Timeline>,

    /// Override the poll frequency.
    pub frequency: Option<u64>,

    /// Override the request timeout.
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            password: None,
            timeline: None,
            frequency: None,
            timeout: None,
        }
    }
}

fn default_base_url() -> String {
    hechte_api::DEFAULT_BASE_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hechte", "hechte").map_or_else(
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
    p.push("hechte");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `HECHTE_*` variables.
///
/// Nested keys use a double underscore: `HECHTE_DEFAULTS__FREQUENCY=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HECHTE_").split("__"))
        .extract()?;
    Ok(config)
}

/// Parse config from a TOML string over the built-in defaults.
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml))
        .extract()?;
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

// ── Profile resolution ──────────────────────────────────────────────

/// Explicit name, then the config's default, then `"default"`.
pub fn active_profile_name(explicit: Option<&str>, config: &Config) -> String {
    explicit
        .map(str::to_owned)
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

// ── Credential resolution ───────────────────────────────────────────

/// Profile username, falling back to `HECHTE_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the password: `HECHTE_PASSWORD`, then the system keyring,
/// then plaintext in the profile.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    first_secret(
        std::env::var(PASSWORD_ENV).ok(),
        || keyring_password(profile_name),
        profile.password.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store `password` in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

fn keyring_password(profile_name: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)).ok()?;
    entry.get_password().ok()
}

fn first_secret(
    env: Option<String>,
    keyring: impl FnOnce() -> Option<String>,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    env.filter(|s| !s.is_empty())
        .or_else(keyring)
        .or_else(|| plaintext.map(str::to_owned))
        .map(SecretString::from)
}

// ── Translation to core ─────────────────────────────────────────────

/// Poller settings for a profile: profile overrides, then `defaults`.
pub fn poller_config(profile: &Profile, defaults: &Defaults) -> Result<PollerConfig, ConfigError> {
    let frequency = profile.frequency.unwrap_or(defaults.frequency);
    if frequency == 0 {
        return Err(ConfigError::Validation {
            field: "frequency".into(),
            reason: "must be at least one second".into(),
        });
    }

    Ok(PollerConfig {
        timeline: profile.timeline.unwrap_or(defaults.timeline),
        frequency: Duration::from_secs(frequency),
        overlap: defaults.overlap,
        superseded: defaults.superseded,
    })
}

/// Parse a service root, rejecting anything that is not http(s).
pub fn parse_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("expected an http(s) URL, got '{raw}'"),
        });
    }
    Ok(url)
}

/// Build a `ClientConfig` from a profile. No CLI flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    Ok(ClientConfig {
        base_url: parse_base_url(&profile.base_url)?,
        username: resolve_username(profile, profile_name)?,
        password: resolve_password(profile, profile_name)?,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        poller: poller_config(profile, defaults)?,
    })
}
