// ── Timeline feed bookkeeping ──
//
// Consumer-side helper for turning raw poll results into what a view
// should show: messages not yet displayed, annotated for the signed-in
// user, and errors without back-to-back repeats.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::model::{Message, MessageBatch, MessageId, Timeline, User};

/// How a message relates to the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    /// Written by the user.
    Mine,
    /// Mentions the user's screen name.
    Reply,
}

/// A message the view has not shown yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub message: Message,
    pub mark: Option<Mark>,
}

#[derive(Debug, Default)]
struct TimelineRecord {
    seen: HashSet<MessageId>,
    last_error: Option<String>,
}

/// Per-timeline record of shown messages and the last shown error.
#[derive(Debug, Default)]
pub struct TimelineFeed {
    me: Option<Arc<User>>,
    records: [TimelineRecord; Timeline::COUNT],
}

impl TimelineFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signed-in account used for [`Mark`]s.
    pub fn set_me(&mut self, me: Arc<User>) {
        self.me = Some(me);
    }

    pub fn me(&self) -> Option<&Arc<User>> {
        self.me.as_ref()
    }

    /// Messages of `batch` not yet shown on `timeline`, in batch order.
    ///
    /// A delivered batch also resets error suppression for the timeline,
    /// so the next failure is shown even if it repeats an earlier one.
    pub fn apply_batch(&mut self, timeline: Timeline, batch: &MessageBatch) -> Vec<FeedEntry> {
        let me = self.me.clone();
        let record = &mut self.records[timeline.index()];
        record.last_error = None;

        batch
            .iter()
            .filter(|message| record.seen.insert(message.id))
            .map(|message| FeedEntry {
                mark: me.as_deref().and_then(|me| mark_for(message, me)),
                message: message.clone(),
            })
            .collect()
    }

    /// Whether `err` should be shown: `false` when it repeats the error
    /// last shown for the same timeline.
    pub fn apply_error(&mut self, err: &FetchError) -> bool {
        let record = &mut self.records[err.timeline.index()];
        if record.last_error.as_deref() == Some(err.message.as_str()) {
            return false;
        }
        record.last_error = Some(err.message.clone());
        true
    }

    /// Forget everything shown on `timeline`.
    pub fn clear(&mut self, timeline: Timeline) {
        self.records[timeline.index()] = TimelineRecord::default();
    }

    /// Number of distinct messages shown on `timeline`.
    pub fn shown(&self, timeline: Timeline) -> usize {
        self.records[timeline.index()].seen.len()
    }
}

fn mark_for(message: &Message, me: &User) -> Option<Mark> {
    if message.belongs_to(me) {
        Some(Mark::Mine)
    } else if message.mentions(me) {
        Some(Mark::Reply)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::{FetchErrorKind, SourceError};
    use crate::model::fixtures::{message, user};

    fn ids(entries: &[FeedEntry]) -> Vec<MessageId> {
        entries.iter().map(|e| e.message.id).collect()
    }

    #[test]
    fn repeated_messages_are_filtered_per_timeline() {
        let ada = user(1, "ada");
        let mut feed = TimelineFeed::new();
        let first = Arc::new(vec![message(1, &ada, "a"), message(2, &ada, "b")]);
        let second = Arc::new(vec![message(2, &ada, "b"), message(3, &ada, "c")]);

        assert_eq!(ids(&feed.apply_batch(Timeline::Friends, &first)), [1, 2]);
        assert_eq!(ids(&feed.apply_batch(Timeline::Friends, &second)), [3]);
        // Other timelines keep their own record.
        assert_eq!(ids(&feed.apply_batch(Timeline::Everyone, &second)), [2, 3]);
        assert_eq!(feed.shown(Timeline::Friends), 3);
    }

    #[test]
    fn marks_prefer_authorship_over_mentions() {
        let me = user(1, "ada");
        let grace = user(2, "grace");
        let mut feed = TimelineFeed::new();
        feed.set_me(Arc::clone(&me));

        let batch = Arc::new(vec![
            message(1, &me, "note to self @ada"),
            message(2, &grace, "hey @Ada"),
            message(3, &grace, "unrelated"),
        ]);
        let marks: Vec<_> = feed
            .apply_batch(Timeline::Friends, &batch)
            .into_iter()
            .map(|e| e.mark)
            .collect();
        assert_eq!(marks, [Some(Mark::Mine), Some(Mark::Reply), None]);
    }

    #[test]
    fn no_marks_without_me() {
        let ada = user(1, "ada");
        let mut feed = TimelineFeed::new();
        let entries = feed.apply_batch(Timeline::Replies, &Arc::new(vec![message(1, &ada, "@ada")]));
        assert_eq!(entries[0].mark, None);
    }

    #[test]
    fn consecutive_duplicate_errors_are_suppressed() {
        let ada = user(1, "ada");
        let mut feed = TimelineFeed::new();
        let err = |timeline, text: &str| {
            FetchError::from_source(timeline, SourceError::new(FetchErrorKind::Network, text))
        };

        assert!(feed.apply_error(&err(Timeline::Friends, "down")));
        assert!(!feed.apply_error(&err(Timeline::Friends, "down")));
        assert!(feed.apply_error(&err(Timeline::Replies, "down")));
        assert!(feed.apply_error(&err(Timeline::Friends, "still down")));

        feed.apply_batch(Timeline::Friends, &Arc::new(vec![message(1, &ada, "back")]));
        assert!(feed.apply_error(&err(Timeline::Friends, "still down")));
    }

    #[test]
    fn clear_forgets_shown_messages() {
        let ada = user(1, "ada");
        let mut feed = TimelineFeed::new();
        let batch = Arc::new(vec![message(1, &ada, "a")]);
        feed.apply_batch(Timeline::Friends, &batch);
        feed.clear(Timeline::Friends);
        assert_eq!(ids(&feed.apply_batch(Timeline::Friends, &batch)), [1]);
    }
}
