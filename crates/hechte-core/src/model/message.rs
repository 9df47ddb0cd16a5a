// ── Messages and their authors ──

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service-assigned message identifier.
pub type MessageId = u64;

/// Service-assigned user identifier.
pub type UserId = u64;

/// An account on the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub screen_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub url: Option<String>,
    pub protected: bool,
}

/// A single status in a timeline.
///
/// Two messages are equal when their ids match, whatever else differs
/// (favorited flag, re-fetched author profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub author: Arc<User>,
    pub favorited: bool,
    pub source: Option<String>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Message {}

impl Message {
    /// Whether the text mentions `user`'s screen name (case-insensitive).
    pub fn mentions(&self, user: &User) -> bool {
        if user.screen_name.is_empty() {
            return false;
        }
        self.text
            .to_lowercase()
            .contains(&user.screen_name.to_lowercase())
    }

    /// Whether `user` authored this message.
    pub fn belongs_to(&self, user: &User) -> bool {
        self.author.id == user.id
    }
}

/// One fetch's worth of messages, oldest first.
pub type MessageBatch = Arc<Vec<Message>>;
