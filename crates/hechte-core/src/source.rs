// ── Remote timeline sources ──
//
// `TimelineSource` is the seam between the poller and the network. The
// poller only ever calls it; `RemoteSource` is the HTTP-backed
// implementation, tests plug in scripted ones.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use hechte_api::{Credentials, RawStatus, TimelineClient, TransportConfig};

use crate::config::ClientConfig;
use crate::convert::message_with_author;
use crate::error::SourceError;
use crate::model::{Message, Timeline, User, UserId};

/// Retrieves the three named timelines. Every method returns messages
/// in the service's order: newest first.
pub trait TimelineSource: Send + Sync + 'static {
    fn fetch_public_timeline(&self)
    -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send;

    fn fetch_friends_timeline(&self)
    -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send;

    fn fetch_replies(&self) -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send;

    /// Fetch whichever endpoint backs `timeline`.
    fn fetch(
        &self,
        timeline: Timeline,
    ) -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send {
        async move {
            match timeline {
                Timeline::Friends => self.fetch_friends_timeline().await,
                Timeline::Replies => self.fetch_replies().await,
                Timeline::Everyone => self.fetch_public_timeline().await,
            }
        }
    }
}

impl<S: TimelineSource> TimelineSource for Arc<S> {
    fn fetch_public_timeline(
        &self,
    ) -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send {
        (**self).fetch_public_timeline()
    }

    fn fetch_friends_timeline(
        &self,
    ) -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send {
        (**self).fetch_friends_timeline()
    }

    fn fetch_replies(&self) -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send {
        (**self).fetch_replies()
    }
}

// ── RemoteSource ─────────────────────────────────────────────────

/// [`TimelineSource`] backed by the service's HTTP API.
///
/// Interns authors by id: a user appearing in many messages (or many
/// polls) shares one `Arc<User>` until their profile changes.
pub struct RemoteSource {
    client: TimelineClient,
    users: DashMap<UserId, Arc<User>>,
}

impl RemoteSource {
    pub fn new(client: TimelineClient) -> Self {
        Self {
            client,
            users: DashMap::new(),
        }
    }

    /// Build the HTTP client described by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, SourceError> {
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let client = TimelineClient::new(config.base_url.clone(), credentials, &transport)?;
        Ok(Self::new(client))
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &TimelineClient {
        &self.client
    }

    /// The signed-in account, used to mark the user's own messages.
    pub async fn me(&self) -> Result<Arc<User>, SourceError> {
        let raw = self.client.me().await?;
        Ok(self.intern(User::from(raw)))
    }

    /// Number of distinct authors seen so far.
    pub fn known_users(&self) -> usize {
        self.users.len()
    }

    fn intern(&self, user: User) -> Arc<User> {
        let mut entry = self
            .users
            .entry(user.id)
            .or_insert_with(|| Arc::new(user.clone()));
        if **entry != user {
            *entry = Arc::new(user);
        }
        Arc::clone(&entry)
    }

    fn convert(&self, raw: Vec<RawStatus>) -> Vec<Message> {
        raw.into_iter()
            .map(|status| {
                let author = self.intern(User::from(status.user.clone()));
                message_with_author(status, author)
            })
            .collect()
    }
}

impl TimelineSource for RemoteSource {
    async fn fetch_public_timeline(&self) -> Result<Vec<Message>, SourceError> {
        let raw = self.client.public_timeline().await?;
        debug!(count = raw.len(), "public timeline fetched");
        Ok(self.convert(raw))
    }

    async fn fetch_friends_timeline(&self) -> Result<Vec<Message>, SourceError> {
        let raw = self.client.friends_timeline().await?;
        debug!(count = raw.len(), "friends timeline fetched");
        Ok(self.convert(raw))
    }

    async fn fetch_replies(&self) -> Result<Vec<Message>, SourceError> {
        let raw = self.client.replies().await?;
        debug!(count = raw.len(), "replies fetched");
        Ok(self.convert(raw))
    }
}
