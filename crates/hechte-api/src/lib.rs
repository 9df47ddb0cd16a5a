// hechte-api: Async Rust client for the service's timeline endpoints

pub mod client;
pub mod error;
pub mod models;
pub mod timelines;
pub mod transport;

pub use client::{Credentials, DEFAULT_BASE_URL, TimelineClient};
pub use error::Error;
pub use models::{RawStatus, RawUser};
pub use transport::TransportConfig;
