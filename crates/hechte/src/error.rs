//! CLI error types with miette diagnostics.
//!
//! Maps config, fetch, and poller errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use hechte_config::ConfigError;
use hechte_core::{FetchError, FetchErrorKind, PollerError, SourceError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the service: {message}")]
    #[diagnostic(
        code(hechte::connection_failed),
        help(
            "Check your network connection and the profile's base_url.\n\
             Try a longer --timeout if the service is slow."
        )
    )]
    ConnectionFailed { message: String },

    #[error("The service returned an error: {message}")]
    #[diagnostic(
        code(hechte::service),
        help("The service may be rate limiting or unavailable. Try again later.")
    )]
    Service { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(hechte::auth_failed),
        help(
            "Verify your username and password.\n\
             Run: hechte config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(hechte::no_credentials),
        help(
            "Set a username with: hechte config set username <name>\n\
             Store a password with: hechte config set-password\n\
             Or set HECHTE_USERNAME and HECHTE_PASSWORD.\n\
             The public timeline works without credentials: hechte fetch -t everyone"
        )
    )]
    NoCredentials { profile: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hechte::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(hechte::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: hechte --profile {name} config set base_url <url>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(hechte::config))]
    Config(Box<ConfigError>),

    // ── Poller ───────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(hechte::poller))]
    Poller(#[from] PollerError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(hechte::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Classify a fetch failure. `profile` names the account for help text.
    pub fn from_fetch(kind: FetchErrorKind, message: String, profile: &str) -> Self {
        match kind {
            FetchErrorKind::Network => Self::ConnectionFailed { message },
            FetchErrorKind::Authentication => Self::AuthFailed {
                profile: profile.into(),
            },
            FetchErrorKind::RateLimited | FetchErrorKind::Service | FetchErrorKind::Malformed => {
                Self::Service { message }
            }
            FetchErrorKind::Configuration => Self::Validation {
                field: "base_url".into(),
                reason: message,
            },
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        Self::from_fetch(err.kind, err.message, "current")
    }
}

impl From<SourceError> for CliError {
    fn from(err: SourceError) -> Self {
        Self::from_fetch(err.kind, err.message, "current")
    }
}
