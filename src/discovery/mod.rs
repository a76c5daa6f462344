pub mod mentions;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::reddit::{Collaborators, DocumentSource};
use crate::store::{normalize_name, EntityStore};
use crate::tracking::WorkingSet;

pub use mentions::{extract_mentions, unique_mentions};

/// Mentions gathered from the external list pages during one cycle.
#[derive(Debug, Clone, Default)]
pub struct ListScan {
    pub mentions: Vec<String>,
    pub pages_loaded: Vec<String>,
    pub pages_skipped: Vec<String>,
}

impl ListScan {
    /// Deduplicated names, the form reconciliation works on.
    pub fn list_subs(&self) -> BTreeSet<String> {
        unique_mentions(&self.mentions)
    }

    /// Every mention alphabetized, repeats included.
    pub fn alphabetized(&self) -> Vec<String> {
        let mut sorted = self.mentions.clone();
        sorted.sort();
        sorted
    }
}

pub async fn scan_list_pages(documents: &dyn DocumentSource, pages: &[String]) -> ListScan {
    let mut scan = ListScan::default();
    for page in pages {
        match documents.document(page).await {
            Ok(text) => {
                let found = extract_mentions(&text);
                debug!("wiki page {page}: {} mentions", found.len());
                scan.mentions.extend(found);
                scan.pages_loaded.push(page.clone());
            }
            Err(err) => {
                warn!("skipping wiki page {page}: {err}");
                scan.pages_skipped.push(page.clone());
            }
        }
    }
    scan
}

/// Fetches, stores and classifies `name` unless this cycle already knows it.
/// Returns whether the name was new to the working set.
pub async fn admit_candidate(
    store: &EntityStore,
    sources: &Collaborators<'_>,
    working: &mut WorkingSet,
    name: &str,
) -> Result<bool> {
    let name = normalize_name(name);
    if name.is_empty() || working.contains(&name) {
        return Ok(false);
    }
    let subscribers = sources.counts.subscriber_count(&name).await;
    debug!("adding /r/{name} with {subscribers}");
    let inserted = store
        .insert(&name, subscribers, sources.clock.now())
        .with_context(|| format!("failed storing /r/{name}"))?;
    if !inserted {
        debug!("/r/{name} was already stored");
    }
    working.record(&name, subscribers);
    Ok(true)
}

pub async fn discover_from_feed(
    store: &EntityStore,
    sources: &Collaborators<'_>,
    working: &mut WorkingSet,
    limit: usize,
) -> Result<usize> {
    let names = sources
        .feed
        .sample(limit)
        .await
        .context("failed loading sample feed")?;
    let mut discovered = 0;
    for name in &names {
        if admit_candidate(store, sources, working, name).await? {
            discovered += 1;
        }
    }
    Ok(discovered)
}

pub async fn discover_from_list(
    store: &EntityStore,
    sources: &Collaborators<'_>,
    working: &mut WorkingSet,
    scan: &ListScan,
) -> Result<usize> {
    let mut discovered = 0;
    for name in &scan.mentions {
        if admit_candidate(store, sources, working, name).await? {
            discovered += 1;
        }
    }
    Ok(discovered)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::discovery::{discover_from_feed, discover_from_list, scan_list_pages};
    use crate::reddit::fakes::{FakeCounts, FakeDocuments, FakeFeed, FakePublisher, FixedClock};
    use crate::reddit::Collaborators;
    use crate::store::{EntityStore, UNKNOWN_SUBSCRIBERS};
    use crate::tracking::WorkingSet;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn feed_candidates_are_fetched_once_and_stored() {
        let store = EntityStore::open_in_memory().expect("store");
        let counts = FakeCounts::with(&[("rust", 300_000), ("tiny", 12)]);
        let feed = FakeFeed::with(&["rust", "Rust", "tiny", "known"]);
        let documents = FakeDocuments::default();
        let publisher = FakePublisher::default();
        let clock = clock();
        let sources = Collaborators {
            counts: &counts,
            feed: &feed,
            documents: &documents,
            publisher: &publisher,
            clock: &clock,
        };
        let mut working = WorkingSet::new(50_000);
        working.record("known", 70_000);

        let found = discover_from_feed(&store, &sources, &mut working, 10)
            .await
            .expect("discover");
        assert_eq!(found, 2);
        assert_eq!(counts.calls(), vec!["rust", "tiny"]);
        assert!(working.above().contains("rust"));
        assert!(working.below().contains("tiny"));
        assert_eq!(store.count().expect("count"), 2);
    }

    #[tokio::test]
    async fn failing_page_is_skipped() {
        let documents = FakeDocuments::with(&[("main", "* /r/Foo\n* /r/foo\n* /r/bar")]);
        let pages = vec!["main".to_string(), "missing".to_string()];
        let scan = scan_list_pages(&documents, &pages).await;
        assert_eq!(scan.pages_loaded, vec!["main"]);
        assert_eq!(scan.pages_skipped, vec!["missing"]);
        assert_eq!(scan.mentions.len(), 3);
        assert_eq!(scan.list_subs().len(), 2);
        assert_eq!(scan.alphabetized(), vec!["bar", "foo", "foo"]);
    }

    #[tokio::test]
    async fn list_mentions_tolerate_existing_rows() {
        let store = EntityStore::open_in_memory().expect("store");
        let clock = clock();
        store
            .insert("foo", 10, clock.0)
            .expect("pre-existing row");
        let counts = FakeCounts::default();
        let feed = FakeFeed::with(&[]);
        let documents = FakeDocuments::with(&[("main", "/r/Foo /r/foo")]);
        let publisher = FakePublisher::default();
        let sources = Collaborators {
            counts: &counts,
            feed: &feed,
            documents: &documents,
            publisher: &publisher,
            clock: &clock,
        };
        let scan = scan_list_pages(&documents, &["main".to_string()]).await;
        let mut working = WorkingSet::new(50_000);

        let found = discover_from_list(&store, &sources, &mut working, &scan)
            .await
            .expect("discover");
        assert_eq!(found, 1);
        assert_eq!(working.count("foo"), Some(UNKNOWN_SUBSCRIBERS));
        assert_eq!(store.count().expect("count"), 1);
    }
}
