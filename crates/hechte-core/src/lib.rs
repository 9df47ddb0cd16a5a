//! Timeline polling engine between `hechte-api` and UI consumers.
//!
//! This crate owns the polling lifecycle and the domain model for the
//! hechte workspace:
//!
//! - **[`TimelinePoller`]**: Periodically fetches the active [`Timeline`]
//!   from a [`TimelineSource`] on background tasks.
//!   [`start()`](TimelinePoller::start) fetches immediately and then once per
//!   period; [`change_timeline()`](TimelinePoller::change_timeline) swaps the
//!   schedule; [`stop()`](TimelinePoller::stop) halts it for good and
//!   [`join()`](TimelinePoller::join) waits for in-flight work.
//!
//! - **[`TimelineObserver`]**: Receives [`PollerState`] transitions around
//!   each fetch and every delivered [`MessageBatch`], oldest first. All
//!   notifications, including the error sink, go through a consumer-supplied
//!   [`Dispatcher`]; [`dispatch::channel()`] gives a queue the consumer drains
//!   on its own task.
//!
//! - **[`RemoteSource`]**: The HTTP-backed source built from a
//!   [`ClientConfig`]. Interns authors so a user shared by many messages is
//!   one allocation.
//!
//! - **[`TimelineFeed`]**: Consumer-side bookkeeping: which messages a view
//!   already shows, [`Mark`]s for the signed-in user, and suppression of
//!   repeated errors.

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod model;
pub mod observer;
pub mod poller;
pub mod source;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    ClientConfig, DEFAULT_FREQUENCY_SECS, OverlapPolicy, PollerConfig, SupersededPolicy,
};
pub use dispatch::{ChannelDispatcher, DispatchQueue, Dispatcher, Inline, Job};
pub use error::{FetchError, FetchErrorKind, FetchOnceError, PollerError, SourceError};
pub use feed::{FeedEntry, Mark, TimelineFeed};
pub use model::{Message, MessageBatch, MessageId, Timeline, User, UserId};
pub use observer::{ObserverId, PollerState, TimelineObserver};
pub use poller::{ErrorSink, Subscription, TimelinePoller};
pub use source::{RemoteSource, TimelineSource};
