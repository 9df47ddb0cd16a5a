// ── Core error types ──
//
// Two families, kept apart so consumers can tell "show a retry banner"
// from "this is a bug":
//
// - `SourceError` / `FetchError`: one fetch attempt failed. Recovered
//   inside the poller and surfaced only through the error sink.
// - `PollerError`: the poller was misused. Returned synchronously to the
//   caller.

use thiserror::Error;

use crate::model::Timeline;

/// Classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Connection refused, DNS failure, timeout.
    Network,
    /// The service answered with a failure status.
    Service,
    /// The service rejected our credentials.
    Authentication,
    /// The service refused the request for excess requests.
    RateLimited,
    /// The response body could not be decoded.
    Malformed,
    /// The request could not be built (bad base URL, client setup).
    Configuration,
}

impl FetchErrorKind {
    /// Whether the next periodic tick has a fair chance of succeeding.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Service | Self::RateLimited | Self::Malformed
        )
    }
}

/// A failure reported by a [`TimelineSource`](crate::TimelineSource).
///
/// Carries no timeline; the poller tags it when it becomes a
/// [`FetchError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SourceError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }
}

/// A failed fetch attempt, tagged with the timeline it was fetching.
///
/// `Display` is the human-readable description; two consecutive errors
/// with identical text can be collapsed by the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    pub timeline: Timeline,
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn from_source(timeline: Timeline, err: SourceError) -> Self {
        Self {
            timeline,
            kind: err.kind,
            message: err.message,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Misuse of the poller API. Always a bug in the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerError {
    #[error("poller has not been started")]
    NotStarted,

    #[error("poller is already running")]
    AlreadyStarted,

    #[error("poller has been stopped")]
    Stopped,

    #[error("poller is still running; stop it before joining")]
    StillRunning,

    #[error("poll frequency must be greater than zero")]
    InvalidFrequency,

    #[error("unknown timeline '{name}' (expected friends, replies or everyone)")]
    UnknownTimeline { name: String },
}

/// Why [`TimelinePoller::fetch_once`](crate::TimelinePoller::fetch_once)
/// returned no batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchOnceError {
    /// The call itself was invalid; nothing was fetched.
    #[error(transparent)]
    Misuse(#[from] PollerError),

    /// The fetch ran and failed. Already reported to the error sink.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hechte_api::Error> for SourceError {
    fn from(err: hechte_api::Error) -> Self {
        let kind = match &err {
            hechte_api::Error::Transport(_) => FetchErrorKind::Network,
            hechte_api::Error::Authentication { .. } => FetchErrorKind::Authentication,
            hechte_api::Error::RateLimited { .. } => FetchErrorKind::RateLimited,
            hechte_api::Error::Service { .. } => FetchErrorKind::Service,
            hechte_api::Error::Malformed { .. } => FetchErrorKind::Malformed,
            hechte_api::Error::InvalidUrl(_) | hechte_api::Error::ClientBuild(_) => {
                FetchErrorKind::Configuration
            }
        };
        Self::new(kind, err.to_string())
    }
}
