pub mod http;

#[cfg(test)]
pub(crate) mod fakes;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use http::RedditClient;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {preview}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        preview: String,
    },
    #[error("unexpected response from {url}: {detail}")]
    Shape { url: String, detail: String },
}

/// Current subscriber count for a subreddit. Implementations never fail;
/// any error collapses to [`crate::store::UNKNOWN_SUBSCRIBERS`].
#[async_trait]
pub trait CountSource: Send + Sync {
    async fn subscriber_count(&self, name: &str) -> i64;
}

/// Owning subreddit names of recently popular posts, lowercased.
#[async_trait]
pub trait SampleFeed: Send + Sync {
    async fn sample(&self, limit: usize) -> Result<Vec<String>, SourceError>;
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn document(&self, page: &str) -> Result<String, SourceError>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, page: &str, text: &str) -> Result<(), SourceError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything a cycle talks to besides the store.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub counts: &'a dyn CountSource,
    pub feed: &'a dyn SampleFeed,
    pub documents: &'a dyn DocumentSource,
    pub publisher: &'a dyn Publisher,
    pub clock: &'a dyn Clock,
}

impl<'a> Collaborators<'a> {
    pub fn from_client(client: &'a RedditClient, clock: &'a dyn Clock) -> Self {
        Self {
            counts: client,
            feed: client,
            documents: client,
            publisher: client,
            clock,
        }
    }
}
