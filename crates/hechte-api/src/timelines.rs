// Timeline and account endpoints
//
// The three timeline reads the poller depends on, plus the account
// lookup used to recognise the signed-in user's own messages.

use tracing::debug;

use crate::client::{Auth, TimelineClient};
use crate::error::Error;
use crate::models::{RawStatus, RawUser};

impl TimelineClient {
    /// The public timeline. Does not send credentials.
    ///
    /// `GET /statuses/public_timeline.json`
    pub async fn public_timeline(&self) -> Result<Vec<RawStatus>, Error> {
        let url = self.endpoint_url("statuses/public_timeline")?;
        debug!("fetching public timeline");
        self.get(url, Auth::Anonymous).await
    }

    /// Statuses from the accounts the user follows.
    ///
    /// `GET /statuses/friends_timeline.json`
    pub async fn friends_timeline(&self) -> Result<Vec<RawStatus>, Error> {
        let url = self.endpoint_url("statuses/friends_timeline")?;
        debug!("fetching friends timeline");
        self.get(url, Auth::Required).await
    }

    /// Statuses that mention the user.
    ///
    /// `GET /statuses/replies.json`
    pub async fn replies(&self) -> Result<Vec<RawStatus>, Error> {
        let url = self.endpoint_url("statuses/replies")?;
        debug!("fetching replies");
        self.get(url, Auth::Required).await
    }

    /// Look up a user by screen name or id.
    ///
    /// `GET /users/show/{who}.json`
    pub async fn show_user(&self, who: &str) -> Result<RawUser, Error> {
        let url = self.endpoint_url(&format!("users/show/{who}"))?;
        debug!(who, "looking up user");
        self.get(url, Auth::Required).await
    }

    /// The signed-in account.
    pub async fn me(&self) -> Result<RawUser, Error> {
        self.show_user(self.username()).await
    }
}
