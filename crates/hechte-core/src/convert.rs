// ── Wire-to-domain conversion ──
//
// Maps `hechte-api` response types into canonical domain types.
// Authors are interned by the caller so one user shared by many
// messages is one allocation. Status text arrives HTML-escaped.

use std::sync::Arc;

use hechte_api::{RawStatus, RawUser};

use crate::model::{Message, User};

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            screen_name: raw.screen_name,
            location: raw.location.filter(|s| !s.is_empty()),
            description: raw.description.filter(|s| !s.is_empty()),
            profile_image_url: raw.profile_image_url,
            url: raw.url.filter(|s| !s.is_empty()),
            protected: raw.protected.unwrap_or(false),
        }
    }
}

impl From<RawStatus> for Message {
    fn from(raw: RawStatus) -> Self {
        let author = Arc::new(User::from(raw.user.clone()));
        message_with_author(raw, author)
    }
}

/// Build a message around an already-interned author.
pub(crate) fn message_with_author(raw: RawStatus, author: Arc<User>) -> Message {
    Message {
        id: raw.id,
        created_at: raw.created_at,
        text: html_escape::decode_html_entities(&raw.text).into_owned(),
        author,
        favorited: raw.favorited.unwrap_or(false),
        source: raw.source,
    }
}
