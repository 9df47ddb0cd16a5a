// Wire models for the timeline endpoints
//
// The service returns bare JSON arrays of status objects, newest first.
// Optional fields use `#[serde(default)]` because the service omits or
// nulls them freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Error body ───────────────────────────────────────────────────────

/// The service reports request-level failures as `{"error": "..."}`
/// with HTTP 200.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

// ── User ─────────────────────────────────────────────────────────────

/// A user object, as embedded in every status and returned by
/// `users/show`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUser {
    pub id: u64,
    pub name: String,
    pub screen_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "is_protected")]
    pub protected: Option<bool>,
}

// ── Status ───────────────────────────────────────────────────────────

/// A single status (message) from a timeline endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatus {
    pub id: u64,
    #[serde(with = "service_time")]
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub user: RawUser,
    #[serde(default)]
    pub favorited: Option<bool>,
    /// Name (often an HTML anchor) of the client that posted the status.
    #[serde(default)]
    pub source: Option<String>,
}

/// The service timestamp format: `Wed Aug 27 13:08:45 +0000 2008`.
pub mod service_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_service_timestamp() {
        let json = r#"{
            "id": 42,
            "created_at": "Wed Aug 27 13:08:45 +0000 2008",
            "text": "hello",
            "user": { "id": 1, "name": "Ada", "screen_name": "ada" }
        }"#;
        let status: RawStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.created_at.year(), 2008);
        assert_eq!(status.created_at.month(), 8);
        assert_eq!(status.created_at.hour(), 13);
        assert_eq!(status.favorited, None);
        assert_eq!(status.user.protected, None);
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let json = r#"{
            "id": 7,
            "created_at": "Thu Jan 01 02:00:00 +0200 2009",
            "text": "x",
            "user": { "id": 1, "name": "Ada", "screen_name": "ada", "is_protected": true }
        }"#;
        let status: RawStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.created_at.hour(), 0);
        assert_eq!(status.user.protected, Some(true));
    }

    #[test]
    fn rejects_iso_timestamps() {
        let json = r#"{
            "id": 7,
            "created_at": "2009-01-01T00:00:00Z",
            "text": "x",
            "user": { "id": 1, "name": "Ada", "screen_name": "ada" }
        }"#;
        assert!(serde_json::from_str::<RawStatus>(json).is_err());
    }
}
