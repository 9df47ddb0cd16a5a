// ── Consumer-context hand-off ──
//
// The poller never runs consumer code on its own tasks. Every observer
// and error-sink notification is wrapped in a `Job` and handed to the
// consumer's `Dispatcher`, which decides where it actually executes.

use tokio::sync::mpsc;
use tracing::trace;

/// A unit of consumer work produced by the poller.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on the consumer's preferred execution context.
///
/// Implementations must not block; a dispatcher is a hand-off, not an
/// executor.
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, job: Job);
}

impl<F> Dispatcher for F
where
    F: Fn(Job) + Send + Sync + 'static,
{
    fn dispatch(&self, job: Job) {
        self(job);
    }
}

/// Runs every job immediately on the calling task.
///
/// Used by `fetch_once` when no dispatcher has been supplied, and handy
/// in tests. Observers then run on the poller's own tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Dispatcher for Inline {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Create a channel-backed dispatcher and the queue the consumer drains.
pub fn channel() -> (ChannelDispatcher, DispatchQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelDispatcher { tx }, DispatchQueue { rx })
}

/// Dispatcher half of [`channel`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            trace!("dispatch queue closed, dropping job");
        }
    }
}

/// Consumer half of [`channel`]: jobs queue here until the consumer
/// runs them on its own context.
#[derive(Debug)]
pub struct DispatchQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl DispatchQueue {
    /// Wait for the next job and run it. Returns `false` once every
    /// dispatcher has been dropped and the queue is empty.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run every job queued so far without waiting. Returns how many ran.
    ///
    /// Suited to a UI loop that drains the queue from a periodic timer.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Number of jobs waiting to run.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
