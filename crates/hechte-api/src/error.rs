use thiserror::Error;

/// Top-level error type for the `hechte-api` crate.
///
/// Covers every failure mode of the timeline endpoints: transport,
/// authentication, service-reported errors, and undecodable bodies.
/// `hechte-core` classifies these into fetch error kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected by the service (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Service ─────────────────────────────────────────────────────
    /// The service answered with an `{"error": "..."}` body, which it
    /// uses for excess-request (rate limit) rejections.
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// Non-success HTTP status other than 401.
    #[error("Service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// The body was not the JSON we expected, with the raw body for debugging.
    #[error("Malformed output from the service: {message}")]
    Malformed { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on
    /// the next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimited { .. } => true,
            Self::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the service rejected our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
