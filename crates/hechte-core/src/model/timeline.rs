// ── Timeline identity ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::PollerError;

/// One of the three named feeds the service exposes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    /// Statuses from accounts the user follows.
    Friends,
    /// Statuses mentioning the user.
    Replies,
    /// The public timeline.
    #[strum(to_string = "everyone", serialize = "public")]
    #[serde(alias = "public")]
    Everyone,
}

impl Timeline {
    /// Number of timelines; sizes per-timeline arrays.
    pub const COUNT: usize = 3;

    /// Parse a timeline name, rejecting anything outside the closed set.
    pub fn from_name(name: &str) -> Result<Self, PollerError> {
        name.trim()
            .parse()
            .map_err(|_| PollerError::UnknownTimeline { name: name.into() })
    }

    /// All timelines in tab order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Capitalized name for labels and headings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Friends => "Friends",
            Self::Replies => "Replies",
            Self::Everyone => "Everyone",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Friends => 0,
            Self::Replies => 1,
            Self::Everyone => 2,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(Timeline::from_name("friends").unwrap(), Timeline::Friends);
        assert_eq!(Timeline::from_name("REPLIES").unwrap(), Timeline::Replies);
        assert_eq!(Timeline::from_name(" Everyone ").unwrap(), Timeline::Everyone);
    }

    #[test]
    fn public_is_an_alias_for_everyone() {
        assert_eq!(Timeline::from_name("public").unwrap(), Timeline::Everyone);
        assert_eq!(Timeline::Everyone.to_string(), "everyone");
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = Timeline::from_name("mentions").unwrap_err();
        assert!(matches!(err, PollerError::UnknownTimeline { ref name } if name == "mentions"));
    }

    #[test]
    fn indexes_are_dense() {
        let mut seen = [false; Timeline::COUNT];
        for t in Timeline::all() {
            seen[t.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
