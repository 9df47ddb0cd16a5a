// ── Domain model ──
//
// Canonical types shared by the poller, the feed bookkeeping, and
// consumers. Wire types from `hechte-api` are converted in `convert.rs`.

mod message;
mod timeline;

pub use message::{Message, MessageBatch, MessageId, User, UserId};
pub use timeline::Timeline;

#[cfg(test)]
pub(crate) use message::fixtures;
