pub mod entity_store;
pub mod migrations;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use entity_store::EntityStore;

/// Subscriber count recorded for a subreddit that has never been fetched
/// successfully, or whose latest fetch failed.
pub const UNKNOWN_SUBSCRIBERS: i64 = -1;

/// Layout of `checked_date`, identical to SQLite's `CURRENT_TIMESTAMP`.
pub const CHECKED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub checked_at: DateTime<Utc>,
    pub subscribers: i64,
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
