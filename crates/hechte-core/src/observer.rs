// ── Poller observers ──
//
// Ordered registry of listeners for fetch lifecycle and data events.
// The poller snapshots the list at notification time, so registration
// changes never race with a delivery already handed off.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::model::{MessageBatch, Timeline};

/// Per-timeline fetch progress, for spinners and similar affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PollerState {
    /// No fetch has been published for this timeline yet.
    #[default]
    Idle,
    /// A fetch is about to hit the remote source.
    Starting,
    /// The fetch finished (successfully or not), or the timeline was
    /// switched away from.
    Ending,
}

/// Listener for poller events. Both callbacks run through the
/// consumer's dispatcher, never directly on a poller task.
pub trait TimelineObserver: Send + Sync + 'static {
    /// Called before and after every fetch attempt.
    fn on_state_change(&self, state: PollerState, timeline: Timeline) {
        let _ = (state, timeline);
    }

    /// Called with each batch a scheduled fetch delivers, oldest first.
    fn on_batch(&self, batch: &MessageBatch, timeline: Timeline) {
        let _ = (batch, timeline);
    }
}

/// Handle returned by registration, used to remove an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub(crate) type ObserverSnapshot = Arc<[Arc<dyn TimelineObserver>]>;

/// Registration order is notification order.
#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ObserverId, Arc<dyn TimelineObserver>)>>,
}

impl ObserverList {
    pub(crate) fn add(&self, observer: Arc<dyn TimelineObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Returns `true` if the observer was registered.
    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn snapshot(&self) -> ObserverSnapshot {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
