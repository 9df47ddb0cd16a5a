#![allow(clippy::unwrap_used)]
//! Poller lifecycle tests against a scripted source, on paused tokio time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;

use hechte_core::dispatch;
use hechte_core::{
    FetchError, FetchErrorKind, FetchOnceError, Inline, Message, MessageBatch, OverlapPolicy,
    PollerConfig, PollerError, PollerState, SourceError, SupersededPolicy, Timeline,
    TimelineObserver, TimelinePoller, TimelineSource, User,
};

// ── Scripted source ──────────────────────────────────────────────────

struct ScriptedSource {
    delay: Duration,
    calls: Mutex<Vec<Timeline>>,
    failures: Mutex<VecDeque<SourceError>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn fail_next(&self, err: SourceError) {
        self.failures.lock().unwrap().push_back(err);
    }

    fn calls(&self) -> Vec<Timeline> {
        self.calls.lock().unwrap().clone()
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, timeline: Timeline) -> Result<Vec<Message>, SourceError> {
        self.calls.lock().unwrap().push(timeline);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let failure = self.failures.lock().unwrap().pop_front();
        match failure {
            Some(err) => Err(err),
            None => Ok(newest_first()),
        }
    }
}

impl TimelineSource for ScriptedSource {
    async fn fetch_public_timeline(&self) -> Result<Vec<Message>, SourceError> {
        self.respond(Timeline::Everyone).await
    }

    async fn fetch_friends_timeline(&self) -> Result<Vec<Message>, SourceError> {
        self.respond(Timeline::Friends).await
    }

    async fn fetch_replies(&self) -> Result<Vec<Message>, SourceError> {
        self.respond(Timeline::Replies).await
    }
}

fn newest_first() -> Vec<Message> {
    let author = Arc::new(User {
        id: 7,
        name: "Ada".into(),
        screen_name: "ada".into(),
        location: None,
        description: None,
        profile_image_url: None,
        url: None,
        protected: false,
    });
    [3, 2, 1]
        .into_iter()
        .map(|id| Message {
            id,
            created_at: chrono::DateTime::default(),
            text: format!("message {id}"),
            author: Arc::clone(&author),
            favorited: false,
            source: None,
        })
        .collect()
}

// ── Recording observer ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    State(PollerState, Timeline),
    Batch(Vec<u64>, Timeline),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn batches(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Batch(..)))
            .collect()
    }
}

impl TimelineObserver for Recorder {
    fn on_state_change(&self, state: PollerState, timeline: Timeline) {
        self.events.lock().unwrap().push(Event::State(state, timeline));
    }

    fn on_batch(&self, batch: &MessageBatch, timeline: Timeline) {
        let ids = batch.iter().map(|m| m.id).collect();
        self.events.lock().unwrap().push(Event::Batch(ids, timeline));
    }
}

type Errors = Arc<Mutex<Vec<FetchError>>>;

struct Harness {
    poller: TimelinePoller<Arc<ScriptedSource>>,
    recorder: Arc<Recorder>,
    errors: Errors,
}

fn harness(source: &Arc<ScriptedSource>, config: &PollerConfig) -> Harness {
    let errors: Errors = Arc::default();
    let sink = Arc::clone(&errors);
    let poller = TimelinePoller::with_config(Arc::clone(source), config, move |err| {
        sink.lock().unwrap().push(err);
    })
    .unwrap();
    let recorder = Arc::new(Recorder::default());
    poller.add_observer(recorder.clone());
    Harness {
        poller,
        recorder,
        errors,
    }
}

fn every(secs: u64) -> PollerConfig {
    PollerConfig {
        frequency: Duration::from_secs(secs),
        ..PollerConfig::default()
    }
}

/// Let spawned tasks run without crossing any period boundary.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

fn batch(timeline: Timeline) -> Event {
    Event::Batch(vec![1, 2, 3], timeline)
}

// ── fetch_once ───────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_once_brackets_each_timeline_with_states() {
    for timeline in Timeline::all() {
        let source = ScriptedSource::new();
        let h = harness(
            &source,
            &PollerConfig {
                timeline,
                ..PollerConfig::default()
            },
        );

        let got = h.poller.fetch_once().await.unwrap();

        assert_eq!(got.iter().map(|m| m.id).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(
            h.recorder.events(),
            [
                Event::State(PollerState::Starting, timeline),
                Event::State(PollerState::Ending, timeline),
            ]
        );
        assert_eq!(source.calls(), [timeline]);
        assert!(h.errors.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn fetch_once_failure_reaches_error_sink() {
    let source = ScriptedSource::new();
    source.fail_next(SourceError::network("connection refused"));
    let h = harness(
        &source,
        &PollerConfig {
            timeline: Timeline::Replies,
            ..PollerConfig::default()
        },
    );

    let Err(FetchOnceError::Fetch(err)) = h.poller.fetch_once().await else {
        panic!("expected a failed fetch");
    };

    assert_eq!(err.timeline, Timeline::Replies);
    assert_eq!(err.kind, FetchErrorKind::Network);
    let errors = h.errors.lock().unwrap().clone();
    assert_eq!(errors, [err]);
    assert_eq!(
        h.recorder.events(),
        [
            Event::State(PollerState::Starting, Timeline::Replies),
            Event::State(PollerState::Ending, Timeline::Replies),
        ]
    );
}

// ── Scheduling ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn start_fetches_immediately_then_every_period() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(180));

    h.poller.start(Inline).unwrap();
    settle().await;

    assert_eq!(source.calls(), [Timeline::Friends]);
    assert_eq!(
        h.recorder.events(),
        [
            Event::State(PollerState::Starting, Timeline::Friends),
            Event::State(PollerState::Ending, Timeline::Friends),
            batch(Timeline::Friends),
        ]
    );
    assert_eq!(h.poller.state(Timeline::Friends), PollerState::Ending);
    assert_eq!(h.poller.state(Timeline::Replies), PollerState::Idle);

    advance(179).await;
    assert_eq!(source.calls().len(), 1);

    advance(2).await;
    assert_eq!(source.calls().len(), 2);
    assert_eq!(h.recorder.batches().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_error_does_not_stop_polling() {
    let source = ScriptedSource::new();
    source.fail_next(SourceError::network("connection refused"));
    let h = harness(&source, &every(30));

    h.poller.start(Inline).unwrap();
    settle().await;

    {
        let errors = h.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "connection refused");
        assert_eq!(errors[0].timeline, Timeline::Friends);
    }
    assert!(h.recorder.batches().is_empty());
    assert!(h.poller.is_running());

    advance(29).await;
    assert_eq!(source.calls().len(), 1);

    advance(2).await;
    assert_eq!(source.calls().len(), 2);
    assert_eq!(h.recorder.batches(), [batch(Timeline::Friends)]);
    assert_eq!(h.errors.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dispatcher_defers_every_notification() {
    let source = ScriptedSource::new();
    source.fail_next(SourceError::new(FetchErrorKind::Service, "Service error (502)"));
    let h = harness(&source, &every(60));
    let (dispatcher, mut queue) = dispatch::channel();

    h.poller.start(dispatcher).unwrap();
    settle().await;

    // Starting, Ending and the error, all still queued.
    assert!(h.recorder.events().is_empty());
    assert!(h.errors.lock().unwrap().is_empty());
    assert_eq!(queue.len(), 3);

    assert_eq!(queue.run_pending(), 3);
    assert_eq!(h.recorder.events().len(), 2);
    assert_eq!(h.errors.lock().unwrap().len(), 1);

    advance(60).await;
    assert!(h.recorder.batches().is_empty());
    queue.run_pending();
    assert_eq!(h.recorder.batches(), [batch(Timeline::Friends)]);
}

// ── Overlap ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn slow_fetch_skips_overlapping_ticks() {
    let source = ScriptedSource::with_delay(Duration::from_secs(90));
    let h = harness(&source, &every(60));

    h.poller.start(Inline).unwrap();
    advance(130).await;

    // t=0 launched, t=60 skipped while busy, t=120 launched.
    assert_eq!(source.calls().len(), 2);
    assert_eq!(source.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn allow_policy_launches_concurrent_fetches() {
    let source = ScriptedSource::with_delay(Duration::from_secs(90));
    let h = harness(
        &source,
        &PollerConfig {
            overlap: OverlapPolicy::Allow,
            ..every(60)
        },
    );

    h.poller.start(Inline).unwrap();
    advance(130).await;

    assert_eq!(source.calls().len(), 3);
    assert_eq!(source.max_in_flight(), 2);

    // Every attempt still brackets its own Starting/Ending.
    let starts = h
        .recorder
        .events()
        .iter()
        .filter(|e| matches!(e, Event::State(PollerState::Starting, _)))
        .count();
    assert_eq!(starts, 3);
}

// ── Switching timelines ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn switch_during_flight_delivers_tagged_result() {
    let source = ScriptedSource::with_delay(Duration::from_secs(10));
    let h = harness(&source, &every(60));

    let friends = h.poller.start(Inline).unwrap();
    advance(5).await;
    let replies = h.poller.change_timeline(Timeline::Replies).unwrap();

    assert!(!h.poller.is_current(&friends));
    assert!(h.poller.is_current(&replies));
    assert_eq!(h.poller.timeline(), Timeline::Replies);

    advance(20).await;
    assert_eq!(
        h.recorder.batches(),
        [batch(Timeline::Friends), batch(Timeline::Replies)]
    );

    advance(200).await;
    let friends_calls = source
        .calls()
        .into_iter()
        .filter(|t| *t == Timeline::Friends)
        .count();
    assert_eq!(friends_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn switch_emits_ending_for_previous_timeline() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(60));

    h.poller.start(Inline).unwrap();
    settle().await;
    h.poller.change_timeline(Timeline::Everyone).unwrap();
    settle().await;

    assert_eq!(
        h.recorder.events(),
        [
            Event::State(PollerState::Starting, Timeline::Friends),
            Event::State(PollerState::Ending, Timeline::Friends),
            batch(Timeline::Friends),
            Event::State(PollerState::Ending, Timeline::Friends),
            Event::State(PollerState::Starting, Timeline::Everyone),
            Event::State(PollerState::Ending, Timeline::Everyone),
            batch(Timeline::Everyone),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn drop_policy_discards_superseded_result() {
    let source = ScriptedSource::with_delay(Duration::from_secs(10));
    let h = harness(
        &source,
        &PollerConfig {
            superseded: SupersededPolicy::Drop,
            ..every(60)
        },
    );

    h.poller.start(Inline).unwrap();
    advance(5).await;
    h.poller.change_timeline(Timeline::Replies).unwrap();
    advance(20).await;

    assert_eq!(h.recorder.batches(), [batch(Timeline::Replies)]);
}

#[tokio::test(start_paused = true)]
async fn rapid_switches_leave_one_schedule() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(60));

    h.poller.start(Inline).unwrap();
    h.poller.change_timeline(Timeline::Replies).unwrap();
    h.poller.change_timeline(Timeline::Everyone).unwrap();
    settle().await;

    assert_eq!(h.poller.active_schedules(), 1);

    advance(150).await;
    assert_eq!(source.calls(), [Timeline::Everyone; 3]);
}

// ── Stop / join ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn results_after_stop_are_dropped() {
    let source = ScriptedSource::with_delay(Duration::from_secs(10));
    let h = harness(&source, &every(60));

    h.poller.start(Inline).unwrap();
    advance(5).await;
    h.poller.stop();
    h.poller.join().await.unwrap();

    // The in-flight fetch finished and closed its bracket, nothing more.
    assert_eq!(
        h.recorder.events(),
        [
            Event::State(PollerState::Starting, Timeline::Friends),
            Event::State(PollerState::Ending, Timeline::Friends),
        ]
    );

    advance(600).await;
    assert_eq!(source.calls().len(), 1);
    assert_eq!(h.poller.active_schedules(), 0);
}

#[tokio::test(start_paused = true)]
async fn errors_after_stop_are_dropped() {
    let source = ScriptedSource::with_delay(Duration::from_secs(10));
    source.fail_next(SourceError::network("timed out"));
    let h = harness(&source, &every(60));

    h.poller.start(Inline).unwrap();
    advance(5).await;
    h.poller.stop();
    advance(10).await;

    assert!(h.errors.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_final() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(60));

    h.poller.start(Inline).unwrap();
    h.poller.stop();
    h.poller.stop();

    assert!(h.poller.is_stopped());
    assert_eq!(h.poller.start(Inline).unwrap_err(), PollerError::Stopped);
    assert_eq!(
        h.poller.change_timeline(Timeline::Replies).unwrap_err(),
        PollerError::Stopped
    );
    h.poller.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dropping_the_poller_cancels_its_schedule() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(60));

    h.poller.start(Inline).unwrap();
    settle().await;
    drop(h);

    advance(600).await;
    assert_eq!(source.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_poller_stops_overlapping_slow_fetches() {
    let source = ScriptedSource::with_delay(Duration::from_secs(90));
    let h = harness(
        &source,
        &PollerConfig {
            overlap: OverlapPolicy::Allow,
            ..every(60)
        },
    );

    h.poller.start(Inline).unwrap();
    settle().await;
    drop(h);

    advance(600).await;
    assert_eq!(source.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn a_remaining_clone_keeps_polling() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(60));
    let keep = h.poller.clone();

    h.poller.start(Inline).unwrap();
    settle().await;
    drop(h);
    advance(60).await;

    assert_eq!(source.calls().len(), 2);
    assert!(keep.is_running());
    keep.stop();
}

// ── Misuse ───────────────────────────────────────────────────────────

#[tokio::test]
async fn lifecycle_misuse_is_reported() {
    let source = ScriptedSource::new();
    assert!(matches!(
        TimelinePoller::new(Arc::clone(&source), Timeline::Friends, Duration::ZERO, |_| {}),
        Err(PollerError::InvalidFrequency)
    ));

    let h = harness(&source, &every(60));
    assert_eq!(
        h.poller.change_timeline(Timeline::Replies).unwrap_err(),
        PollerError::NotStarted
    );

    h.poller.start(Inline).unwrap();
    assert_eq!(h.poller.start(Inline).unwrap_err(), PollerError::AlreadyStarted);
    assert_eq!(h.poller.join().await.unwrap_err(), PollerError::StillRunning);
    h.poller.stop();
}

#[tokio::test]
async fn fetch_once_after_stop_is_refused() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(60));
    h.poller.stop();

    assert_eq!(
        h.poller.fetch_once().await.unwrap_err(),
        FetchOnceError::Misuse(PollerError::Stopped)
    );
    assert!(source.calls().is_empty());
    assert!(h.recorder.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn removed_observers_stop_receiving() {
    let source = ScriptedSource::new();
    let h = harness(&source, &every(60));
    let second = Arc::new(Recorder::default());
    let id = h.poller.add_observer(second.clone());
    assert_eq!(h.poller.observer_count(), 2);

    assert!(h.poller.remove_observer(id));
    h.poller.start(Inline).unwrap();
    settle().await;

    assert!(second.events().is_empty());
    assert_eq!(h.recorder.batches(), [batch(Timeline::Friends)]);
}
