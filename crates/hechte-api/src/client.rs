// Timeline API HTTP client
//
// Wraps `reqwest::Client` with service-specific URL construction, basic
// auth, and error-body detection. Endpoint methods live in
// `timelines.rs` as inherent methods to keep this module focused on
// transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::ErrorBody;
use crate::transport::TransportConfig;

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://twitter.com";

/// Response format suffix appended to every endpoint path.
const FORMAT: &str = ".json";

/// Account credentials sent as HTTP basic auth.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Whether a request carries basic-auth credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    Required,
    Anonymous,
}

/// Raw HTTP client for the service's timeline endpoints.
///
/// All methods return decoded payloads in the service's own order
/// (newest first); reordering is the caller's business.
pub struct TimelineClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl TimelineClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// The `base_url` is the service root (e.g. `https://twitter.com`).
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account this client authenticates as.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an endpoint path: `{base}/{path}.json`.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}{FORMAT}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url, auth: Auth) -> Result<T, Error> {
        debug!("GET {}", url);

        let mut builder = self.http.get(url);
        if auth == Auth::Required {
            builder = builder.basic_auth(
                &self.credentials.username,
                Some(self.credentials.password.expose_secret()),
            );
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::parse_body(resp).await
    }

    /// Map HTTP status and body into a decoded payload or an [`Error`].
    ///
    /// The service also reports failures as `{"error": "..."}` with
    /// HTTP 200; those surface as [`Error::RateLimited`].
    async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "credentials rejected by the service".into(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
            trace!(error = %err.error, "service returned an error body");
            return Err(Error::RateLimited { message: err.error });
        }

        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                message: preview(&body).to_owned(),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Malformed {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }
}

/// First 200 bytes of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
