// ── Timeline poller ──
//
// Periodic fetch loop over one `TimelineSource`. One scheduler task per
// active timeline, one task per fetch attempt. All mutable state sits
// behind a single mutex held only for short, non-blocking sections,
// never across a fetch. Every schedule carries an epoch; a switch or
// stop bumps it, which is how stale ticks and deliveries are detected.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::config::{OverlapPolicy, PollerConfig, SupersededPolicy};
use crate::dispatch::{Dispatcher, Inline};
use crate::error::{FetchError, FetchOnceError, PollerError};
use crate::model::{MessageBatch, Timeline};
use crate::observer::{ObserverId, ObserverList, PollerState, TimelineObserver};
use crate::source::TimelineSource;

/// Receives every fetch failure, through the consumer's dispatcher.
pub type ErrorSink = Arc<dyn Fn(FetchError) + Send + Sync + 'static>;

/// Identifies one periodic schedule: the timeline it polls and the
/// epoch it was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub timeline: Timeline,
    pub epoch: u64,
}

// ── Internal state ───────────────────────────────────────────────

enum Lifecycle {
    Idle,
    Running { dispatcher: Arc<dyn Dispatcher> },
    Stopped,
}

struct Shared {
    timeline: Timeline,
    lifecycle: Lifecycle,
    epoch: u64,
    schedule: Option<CancellationToken>,
    states: [PollerState; Timeline::COUNT],
}

impl Shared {
    /// Cancel the current schedule and open a new epoch for `self.timeline`.
    fn begin_schedule(&mut self) -> Schedule {
        if let Some(previous) = self.schedule.take() {
            previous.cancel();
        }
        self.epoch += 1;
        let cancel = CancellationToken::new();
        self.schedule = Some(cancel.clone());
        Schedule {
            timeline: self.timeline,
            epoch: self.epoch,
            cancel,
        }
    }

    /// Move to Stopped and cancel the live schedule. Returns `false` if
    /// already stopped.
    fn halt(&mut self) -> bool {
        if matches!(self.lifecycle, Lifecycle::Stopped) {
            return false;
        }
        self.lifecycle = Lifecycle::Stopped;
        self.epoch += 1;
        if let Some(schedule) = self.schedule.take() {
            schedule.cancel();
        }
        true
    }
}

struct Schedule {
    timeline: Timeline,
    epoch: u64,
    cancel: CancellationToken,
}

struct PollerInner<S> {
    source: S,
    frequency: Duration,
    overlap: OverlapPolicy,
    superseded: SupersededPolicy,
    error_sink: ErrorSink,
    observers: ObserverList,
    shared: Mutex<Shared>,
    tracker: TaskTracker,
    schedules: Arc<AtomicUsize>,
}

impl<S> Drop for PollerInner<S> {
    fn drop(&mut self) {
        let shared = self.shared.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(schedule) = shared.schedule.take() {
            schedule.cancel();
            debug!("poller dropped, schedule cancelled");
        }
    }
}

// ── TimelinePoller ───────────────────────────────────────────────

/// Polls one timeline at a time on a fixed frequency and reports to
/// registered observers.
///
/// Cheaply cloneable. Construction does not fetch anything; call
/// [`start()`](Self::start) from within a tokio runtime to begin. When
/// every handle is dropped the poller stops as if by
/// [`stop()`](Self::stop).
pub struct TimelinePoller<S: TimelineSource> {
    inner: Arc<PollerInner<S>>,
    _owner: Arc<Owner<S>>,
}

impl<S: TimelineSource> Clone for TimelinePoller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _owner: Arc::clone(&self._owner),
        }
    }
}

/// Shared only by `TimelinePoller` handles. Fetch tasks keep
/// `PollerInner` alive while they run, so it cannot tell on its own
/// when the last handle is gone.
struct Owner<S>(Weak<PollerInner<S>>);

impl<S> Drop for Owner<S> {
    fn drop(&mut self) {
        let Some(inner) = self.0.upgrade() else { return };
        let halted = inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .halt();
        if halted {
            debug!("last poller handle dropped, polling stopped");
        }
    }
}

impl<S: TimelineSource> TimelinePoller<S> {
    /// Create a poller for `timeline` with default policies.
    pub fn new<E>(
        source: S,
        timeline: Timeline,
        frequency: Duration,
        error_sink: E,
    ) -> Result<Self, PollerError>
    where
        E: Fn(FetchError) + Send + Sync + 'static,
    {
        let config = PollerConfig {
            timeline,
            frequency,
            ..PollerConfig::default()
        };
        Self::with_config(source, &config, error_sink)
    }

    /// Create a poller from a full [`PollerConfig`].
    pub fn with_config<E>(
        source: S,
        config: &PollerConfig,
        error_sink: E,
    ) -> Result<Self, PollerError>
    where
        E: Fn(FetchError) + Send + Sync + 'static,
    {
        if config.frequency.is_zero() {
            return Err(PollerError::InvalidFrequency);
        }

        let inner = Arc::new(PollerInner {
            source,
            frequency: config.frequency,
            overlap: config.overlap,
            superseded: config.superseded,
            error_sink: Arc::new(error_sink),
            observers: ObserverList::default(),
            shared: Mutex::new(Shared {
                timeline: config.timeline,
                lifecycle: Lifecycle::Idle,
                epoch: 0,
                schedule: None,
                states: [PollerState::Idle; Timeline::COUNT],
            }),
            tracker: TaskTracker::new(),
            schedules: Arc::new(AtomicUsize::new(0)),
        });
        let owner = Arc::new(Owner(Arc::downgrade(&inner)));
        Ok(Self {
            inner,
            _owner: owner,
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Begin polling the current timeline.
    ///
    /// The first fetch runs immediately, then once per period. Every
    /// notification from now on goes through `dispatcher`, including
    /// those of later schedules started by
    /// [`change_timeline()`](Self::change_timeline).
    pub fn start(&self, dispatcher: impl Dispatcher) -> Result<Subscription, PollerError> {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);
        let schedule = {
            let mut shared = self.inner.lock();
            match shared.lifecycle {
                Lifecycle::Idle => {}
                Lifecycle::Running { .. } => return Err(PollerError::AlreadyStarted),
                Lifecycle::Stopped => return Err(PollerError::Stopped),
            }
            shared.lifecycle = Lifecycle::Running { dispatcher };
            shared.begin_schedule()
        };

        info!(
            timeline = %schedule.timeline,
            frequency_secs = self.inner.frequency.as_secs(),
            "poller started"
        );
        Ok(self.spawn_schedule(schedule))
    }

    /// Switch to `timeline` and start a fresh schedule for it.
    ///
    /// The old schedule launches no fetch once this returns. A fetch it
    /// already launched runs to completion; its result is tagged with
    /// the timeline it fetched and handled per [`SupersededPolicy`].
    /// Observers see [`PollerState::Ending`] for the old timeline.
    pub fn change_timeline(&self, timeline: Timeline) -> Result<Subscription, PollerError> {
        let (previous, dispatcher, schedule) = {
            let mut shared = self.inner.lock();
            let dispatcher = match &shared.lifecycle {
                Lifecycle::Idle => return Err(PollerError::NotStarted),
                Lifecycle::Stopped => return Err(PollerError::Stopped),
                Lifecycle::Running { dispatcher } => Arc::clone(dispatcher),
            };
            let previous = shared.timeline;
            shared.timeline = timeline;
            (previous, dispatcher, shared.begin_schedule())
        };

        info!(from = %previous, to = %timeline, epoch = schedule.epoch, "switching timeline");
        self.inner
            .publish_state(&dispatcher, PollerState::Ending, previous);
        Ok(self.spawn_schedule(schedule))
    }

    /// Halt polling permanently. Idempotent and non-blocking.
    ///
    /// Fetches already in flight are not aborted, but whatever they
    /// deliver afterwards is dropped. Use [`join()`](Self::join) to wait
    /// for them.
    pub fn stop(&self) {
        if self.inner.lock().halt() {
            info!("poller stopped");
        }
    }

    /// Wait until every background task (schedulers and in-flight
    /// fetches) has finished. Only valid once the poller is stopped.
    pub async fn join(&self) -> Result<(), PollerError> {
        if self.is_running() {
            return Err(PollerError::StillRunning);
        }
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        debug!("poller joined");
        Ok(())
    }

    // ── Fetching ─────────────────────────────────────────────────

    /// Fetch the active timeline once, outside any schedule.
    ///
    /// Emits `Starting` then `Ending`; on failure the error also goes
    /// to the error sink. The batch is returned, oldest first, rather
    /// than delivered to observers. Uses the running dispatcher if there
    /// is one, otherwise notifies observers inline.
    ///
    /// A stopped poller refuses with [`PollerError::Stopped`] and does
    /// not touch the source.
    pub async fn fetch_once(&self) -> Result<MessageBatch, FetchOnceError> {
        let (timeline, dispatcher) = {
            let shared = self.inner.lock();
            let dispatcher: Arc<dyn Dispatcher> = match &shared.lifecycle {
                Lifecycle::Running { dispatcher } => Arc::clone(dispatcher),
                Lifecycle::Idle => Arc::new(Inline),
                Lifecycle::Stopped => return Err(PollerError::Stopped.into()),
            };
            (shared.timeline, dispatcher)
        };
        Ok(self.inner.fetch_and_report(timeline, &dispatcher, None).await?)
    }

    // ── Observers ────────────────────────────────────────────────

    /// Register an observer. Notification order is registration order.
    pub fn add_observer(&self, observer: Arc<dyn TimelineObserver>) -> ObserverId {
        self.inner.observers.add(observer)
    }

    /// Returns `true` if the observer was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    // ── Accessors ────────────────────────────────────────────────

    /// The active timeline.
    pub fn timeline(&self) -> Timeline {
        self.inner.lock().timeline
    }

    pub fn frequency(&self) -> Duration {
        self.inner.frequency
    }

    pub fn is_running(&self) -> bool {
        matches!(self.inner.lock().lifecycle, Lifecycle::Running { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.inner.lock().lifecycle, Lifecycle::Stopped)
    }

    /// Last state published for `timeline`.
    pub fn state(&self, timeline: Timeline) -> PollerState {
        self.inner.lock().states[timeline.index()]
    }

    /// Whether `subscription` is still the live schedule.
    pub fn is_current(&self, subscription: &Subscription) -> bool {
        let shared = self.inner.lock();
        matches!(shared.lifecycle, Lifecycle::Running { .. }) && shared.epoch == subscription.epoch
    }

    /// Scheduler tasks that have not yet exited. Cancelled schedules
    /// drop out once their task observes the cancellation.
    pub fn active_schedules(&self) -> usize {
        self.inner.schedules.load(Ordering::Acquire)
    }

    fn spawn_schedule(&self, schedule: Schedule) -> Subscription {
        let subscription = Subscription {
            timeline: schedule.timeline,
            epoch: schedule.epoch,
        };
        let counter = ScheduleCount::enter(&self.inner.schedules);
        self.inner.tracker.spawn(run_schedule(
            Arc::downgrade(&self.inner),
            schedule,
            self.inner.frequency,
            self.inner.overlap,
            counter,
        ));
        subscription
    }
}

// ── Fetch-and-report protocol ────────────────────────────────────

impl<S: TimelineSource> PollerInner<S> {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One scheduled cycle: gate on the epoch, fetch, deliver.
    async fn poll_cycle(&self, timeline: Timeline, epoch: u64) {
        let Some(dispatcher) = self.admit(epoch) else {
            trace!(%timeline, epoch, "schedule superseded before launch");
            return;
        };

        let Ok(batch) = self
            .fetch_and_report(timeline, &dispatcher, Some(epoch))
            .await
        else {
            return;
        };

        if self.accepts_delivery(epoch) {
            debug!(%timeline, epoch, count = batch.len(), "delivering batch");
            self.publish_batch(&dispatcher, batch, timeline);
        } else {
            debug!(%timeline, epoch, "dropping stale batch");
        }
    }

    /// The dispatcher to use if `epoch` is still the live schedule.
    /// Checked under the same lock that switch and stop take, so no
    /// fetch launches for a schedule once its replacement is visible.
    fn admit(&self, epoch: u64) -> Option<Arc<dyn Dispatcher>> {
        let shared = self.lock();
        match &shared.lifecycle {
            Lifecycle::Running { dispatcher } if shared.epoch == epoch => {
                Some(Arc::clone(dispatcher))
            }
            _ => None,
        }
    }

    fn accepts_delivery(&self, epoch: u64) -> bool {
        let shared = self.lock();
        match shared.lifecycle {
            Lifecycle::Stopped => false,
            _ if shared.epoch == epoch => true,
            _ => self.superseded == SupersededPolicy::Deliver,
        }
    }

    async fn fetch_and_report(
        &self,
        timeline: Timeline,
        dispatcher: &Arc<dyn Dispatcher>,
        epoch: Option<u64>,
    ) -> Result<MessageBatch, FetchError> {
        self.publish_state(dispatcher, PollerState::Starting, timeline);
        let result = self.source.fetch(timeline).await;
        self.publish_state(dispatcher, PollerState::Ending, timeline);

        match result {
            Ok(mut messages) => {
                // Sources answer newest first; consumers get oldest first.
                messages.reverse();
                trace!(%timeline, count = messages.len(), "fetch succeeded");
                Ok(Arc::new(messages))
            }
            Err(err) => {
                let err = FetchError::from_source(timeline, err);
                warn!(%timeline, kind = ?err.kind, error = %err, "fetch failed");
                if epoch.is_none_or(|epoch| self.accepts_delivery(epoch)) {
                    self.report_error(dispatcher, err.clone());
                }
                Err(err)
            }
        }
    }

    // ── Hand-off to the consumer ─────────────────────────────────

    fn publish_state(&self, dispatcher: &Arc<dyn Dispatcher>, state: PollerState, timeline: Timeline) {
        self.lock().states[timeline.index()] = state;

        let observers = self.observers.snapshot();
        if observers.is_empty() {
            return;
        }
        dispatcher.dispatch(Box::new(move || {
            for observer in observers.iter() {
                observer.on_state_change(state, timeline);
            }
        }));
    }

    fn publish_batch(&self, dispatcher: &Arc<dyn Dispatcher>, batch: MessageBatch, timeline: Timeline) {
        let observers = self.observers.snapshot();
        if observers.is_empty() {
            return;
        }
        dispatcher.dispatch(Box::new(move || {
            for observer in observers.iter() {
                observer.on_batch(&batch, timeline);
            }
        }));
    }

    fn report_error(&self, dispatcher: &Arc<dyn Dispatcher>, err: FetchError) {
        let sink = Arc::clone(&self.error_sink);
        dispatcher.dispatch(Box::new(move || sink(err)));
    }
}

// ── Scheduler task ───────────────────────────────────────────────

/// Tick immediately, then once per `frequency`, launching one fetch per
/// tick until cancelled. Holds the poller weakly so an abandoned poller
/// is not kept alive by its own schedule.
async fn run_schedule<S: TimelineSource>(
    poller: Weak<PollerInner<S>>,
    schedule: Schedule,
    frequency: Duration,
    overlap: OverlapPolicy,
    _count: ScheduleCount,
) {
    let Schedule {
        timeline,
        epoch,
        cancel,
    } = schedule;
    let busy = Arc::new(AtomicBool::new(false));
    let mut ticker = tokio::time::interval(frequency);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(%timeline, epoch, "schedule started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = poller.upgrade() else { break };

                if overlap == OverlapPolicy::Skip && busy.swap(true, Ordering::AcqRel) {
                    debug!(%timeline, epoch, "previous fetch still running, skipping tick");
                    continue;
                }

                let guard = BusyGuard(Arc::clone(&busy));
                let tracker = inner.tracker.clone();
                tracker.spawn(async move {
                    let _guard = guard;
                    inner.poll_cycle(timeline, epoch).await;
                });
            }
        }
    }

    debug!(%timeline, epoch, "schedule finished");
}

/// Clears the schedule's busy flag when a fetch task ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Counts a scheduler task from spawn until it exits.
struct ScheduleCount(Arc<AtomicUsize>);

impl ScheduleCount {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for ScheduleCount {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
