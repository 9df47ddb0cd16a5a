// ── Runtime configuration ──
//
// These types describe *what* to poll and *how* to reach the service.
// They carry credential data and tuning, but never touch disk.
// The CLI builds a `ClientConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::Timeline;

/// Default seconds between polls of the active timeline.
pub const DEFAULT_FREQUENCY_SECS: u64 = 180;

/// What to do when a tick fires while the previous fetch for the same
/// schedule is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Skip the tick: at most one outstanding request per schedule.
    #[default]
    Skip,
    /// Launch anyway, allowing concurrent requests for one timeline.
    Allow,
}

/// What to do with the result of a fetch whose schedule was replaced by
/// a timeline switch while it was in flight. Results that arrive after
/// `stop()` are always dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupersededPolicy {
    /// Deliver it, tagged with the timeline it fetched.
    #[default]
    Deliver,
    /// Drop it silently.
    Drop,
}

/// Poller tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Timeline polled when the poller starts.
    pub timeline: Timeline,
    /// Interval between fetch attempts.
    pub frequency: Duration,
    pub overlap: OverlapPolicy,
    pub superseded: SupersededPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            timeline: Timeline::Friends,
            frequency: Duration::from_secs(DEFAULT_FREQUENCY_SECS),
            overlap: OverlapPolicy::default(),
            superseded: SupersededPolicy::default(),
        }
    }
}

/// Everything needed to build a [`RemoteSource`](crate::RemoteSource)
/// and a poller over it.
///
/// Built by the CLI -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root (e.g., `https://twitter.com`).
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    /// Request timeout.
    pub timeout: Duration,
    pub poller: PollerConfig,
}
