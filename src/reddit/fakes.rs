use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::reddit::{Clock, CountSource, DocumentSource, Publisher, SampleFeed, SourceError};
use crate::store::UNKNOWN_SUBSCRIBERS;

#[derive(Default)]
pub struct FakeCounts {
    counts: HashMap<String, i64>,
    calls: Mutex<Vec<String>>,
}

impl FakeCounts {
    pub fn with(entries: &[(&str, i64)]) -> Self {
        Self {
            counts: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl CountSource for FakeCounts {
    async fn subscriber_count(&self, name: &str) -> i64 {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(name.to_string());
        self.counts.get(name).copied().unwrap_or(UNKNOWN_SUBSCRIBERS)
    }
}

pub struct FakeFeed {
    names: Option<Vec<String>>,
}

impl FakeFeed {
    pub fn with(names: &[&str]) -> Self {
        Self {
            names: Some(names.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { names: None }
    }
}

#[async_trait]
impl SampleFeed for FakeFeed {
    async fn sample(&self, limit: usize) -> Result<Vec<String>, SourceError> {
        match &self.names {
            Some(names) => Ok(names.iter().take(limit).cloned().collect()),
            None => Err(SourceError::Shape {
                url: "fake://hot".to_string(),
                detail: "feed offline".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeDocuments {
    pages: HashMap<String, String>,
}

impl FakeDocuments {
    pub fn with(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentSource for FakeDocuments {
    async fn document(&self, page: &str) -> Result<String, SourceError> {
        self.pages
            .get(page)
            .cloned()
            .ok_or_else(|| SourceError::Shape {
                url: format!("fake://wiki/{page}"),
                detail: "no such page".to_string(),
            })
    }
}

#[derive(Default)]
pub struct FakePublisher {
    published: Mutex<Vec<(String, String)>>,
    fail_all: bool,
    fail_on: Option<String>,
}

impl FakePublisher {
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Accepts every page except `page`.
    pub fn failing_on(page: &str) -> Self {
        Self {
            fail_on: Some(page.to_string()),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .expect("publisher mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, page: &str, text: &str) -> Result<(), SourceError> {
        if self.fail_all || self.fail_on.as_deref() == Some(page) {
            return Err(SourceError::Shape {
                url: format!("fake://wiki/{page}"),
                detail: "wiki is read-only".to_string(),
            });
        }
        self.published
            .lock()
            .expect("publisher mutex poisoned")
            .push((page.to_string(), text.to_string()));
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
