//! `hechte watch`: poll a timeline until told to stop.
//!
//! Observer and error-sink callbacks are queued through a channel
//! dispatcher and run on this task, interleaved with stdin commands and
//! Ctrl-C in one `select!` loop.

use std::collections::HashMap;
use std::io::{self, BufRead, IsTerminal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use hechte_core::{
    ClientConfig, FetchError, MessageBatch, PollerState, RemoteSource, Timeline, TimelineFeed,
    TimelineObserver, TimelinePoller, dispatch,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Console view ─────────────────────────────────────────────────────

struct ViewState {
    feed: TimelineFeed,
    spinners: HashMap<Timeline, ProgressBar>,
}

/// Prints new messages and de-duplicated errors; shows one spinner per
/// timeline with a fetch running. Only ever invoked from the dispatch
/// queue.
struct ConsoleView {
    state: Mutex<ViewState>,
    progress: MultiProgress,
    color: bool,
    animate: bool,
}

impl ConsoleView {
    fn new(feed: TimelineFeed, color: bool) -> Self {
        Self {
            state: Mutex::new(ViewState {
                feed,
                spinners: HashMap::new(),
            }),
            progress: MultiProgress::new(),
            color,
            animate: io::stderr().is_terminal(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn show_error(&self, err: &FetchError) {
        let mut state = self.state();
        if !state.feed.apply_error(err) {
            debug!(timeline = %err.timeline, "repeated error suppressed");
            return;
        }
        drop(state);
        self.note(&output::render_error(err.timeline, &err.message, self.color));
    }

    /// Print a line to stderr without tearing any running spinner.
    fn note(&self, line: &str) {
        self.progress.suspend(|| eprintln!("{line}"));
    }

    fn start_spinner(&self, state: &mut ViewState, timeline: Timeline) {
        if !self.animate {
            return;
        }
        let spinner = self.progress.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("fetching {timeline}"));
        spinner.enable_steady_tick(Duration::from_millis(100));
        if let Some(previous) = state.spinners.insert(timeline, spinner) {
            previous.finish_and_clear();
        }
    }
}

impl TimelineObserver for ConsoleView {
    fn on_state_change(&self, state: PollerState, timeline: Timeline) {
        debug!(%timeline, ?state, "poller state");
        let mut view = self.state();
        match state {
            PollerState::Starting => self.start_spinner(&mut view, timeline),
            PollerState::Ending => {
                if let Some(spinner) = view.spinners.remove(&timeline) {
                    spinner.finish_and_clear();
                }
            }
            PollerState::Idle => {}
        }
    }

    fn on_batch(&self, batch: &MessageBatch, timeline: Timeline) {
        let entries = self.state().feed.apply_batch(timeline, batch);
        debug!(%timeline, received = batch.len(), new = entries.len(), "batch");
        for entry in &entries {
            match output::render_entry(OutputFormat::Plain, timeline, entry, self.color) {
                Ok(line) => self.progress.suspend(|| println!("{line}")),
                Err(err) => warn!(error = %err, "could not render message"),
            }
        }
    }
}

// ── Stdin commands ───────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Switch(Timeline),
    Quit,
    Blank,
    Unknown(String),
}

/// Read stdin lines on a plain thread; a blocked read must not hold up
/// runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_input(line: &str) -> Input {
    let word = line.trim();
    if word.is_empty() {
        return Input::Blank;
    }
    if matches!(word.to_ascii_lowercase().as_str(), "quit" | "q" | "exit") {
        return Input::Quit;
    }
    Timeline::from_name(word).map_or_else(|_| Input::Unknown(word.to_owned()), Input::Switch)
}

/// Move the poller to `timeline`, unless the session cannot read it.
fn switch(
    poller: &TimelinePoller<Arc<RemoteSource>>,
    view: &ConsoleView,
    profile_name: &str,
    client: &ClientConfig,
    timeline: Timeline,
) -> Result<(), CliError> {
    if let Err(err) = config::ensure_account(profile_name, client, timeline) {
        view.note(&format!("{err}; staying on {}", poller.timeline()));
        return Ok(());
    }
    poller.change_timeline(timeline)?;
    view.note(&format!("switched to {timeline}"));
    Ok(())
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (profile_name, mut client_config) = config::resolve_client_config(global)?;
    if let Some(timeline) = args.timeline {
        client_config.poller.timeline = timeline;
    }
    if let Some(secs) = args.frequency {
        client_config.poller.frequency = Duration::from_secs(secs);
    }
    config::ensure_account(&profile_name, &client_config, client_config.poller.timeline)?;

    let source = Arc::new(RemoteSource::from_config(&client_config)?);
    let mut feed = TimelineFeed::new();
    if !config::is_anonymous(&client_config) {
        match source.me().await {
            Ok(me) => feed.set_me(me),
            Err(err) => warn!(error = %err, "could not look up the signed-in account"),
        }
    }

    let view = Arc::new(ConsoleView::new(feed, output::should_color(global.color)));
    let sink = Arc::clone(&view);
    let poller = TimelinePoller::with_config(
        Arc::clone(&source),
        &client_config.poller,
        move |err: FetchError| sink.show_error(&err),
    )?;
    poller.add_observer(view.clone());

    let (dispatcher, mut queue) = dispatch::channel();
    poller.start(dispatcher)?;
    info!(
        timeline = %poller.timeline(),
        every_secs = poller.frequency().as_secs(),
        "watching"
    );

    let mut input = spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            ran = queue.run_next() => {
                if !ran {
                    break;
                }
            }
            line = input.recv(), if stdin_open => match line {
                Some(line) => match parse_input(&line) {
                    Input::Switch(timeline) => {
                        switch(&poller, &view, &profile_name, &client_config, timeline)?;
                    }
                    Input::Quit => break,
                    Input::Blank => {}
                    Input::Unknown(word) => {
                        view.note(&format!(
                            "unknown command '{word}': try friends, replies, everyone or quit"
                        ));
                    }
                },
                None => {
                    debug!("stdin closed, watching until interrupted");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    poller.stop();
    poller.join().await?;
    queue.run_pending();
    Ok(())
}
