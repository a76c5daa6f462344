use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::cycle::{run_cycle, CycleSettings, CycleSummary};
use crate::reddit::Collaborators;
use crate::store::EntityStore;

/// Termination request shared with the signal handler. Checked between
/// cycles and while sleeping, never inside a cycle.
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleeps for `interval` unless shutdown is requested first.
    pub async fn sleep(&self, interval: Duration) {
        if self.is_triggered() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = self.notify.notified() => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub interval: Duration,
    pub once: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub cycles: usize,
    pub failures: usize,
    pub last: Option<CycleSummary>,
}

/// Runs cycles until shutdown (or after one cycle with `once`). A failed
/// cycle is logged and the loop carries on after the usual sleep.
pub async fn run_loop(
    store: &EntityStore,
    sources: &Collaborators<'_>,
    settings: &CycleSettings,
    options: &LoopOptions,
    shutdown: &Shutdown,
) -> LoopReport {
    let mut report = LoopReport::default();
    loop {
        if shutdown.is_triggered() {
            info!("shutdown requested, stopping before next run");
            break;
        }
        debug!("starting run {}", report.cycles + 1);
        report.cycles += 1;
        match run_cycle(store, sources, settings).await {
            Ok(summary) => report.last = Some(summary),
            Err(err) => {
                report.failures += 1;
                error!("run failed: {err:?}");
            }
        }
        if options.once {
            break;
        }
        shutdown.sleep(options.interval).await;
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::cycle::CycleSettings;
    use crate::reddit::fakes::{FakeCounts, FakeDocuments, FakeFeed, FakePublisher, FixedClock};
    use crate::reddit::Collaborators;
    use crate::store::EntityStore;
    use crate::supervisor::{run_loop, LoopOptions, Shutdown};
    use crate::tracking::RefreshPolicy;

    fn settings() -> CycleSettings {
        CycleSettings {
            policy: RefreshPolicy::new(100),
            sample_limit: 10,
            list_pages: vec!["list".to_string()],
            report_page: "report".to_string(),
            listing_page: None,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn once_runs_a_single_cycle() {
        let store = EntityStore::open_in_memory().expect("store");
        let counts = FakeCounts::with(&[("big", 500)]);
        let feed = FakeFeed::with(&["big"]);
        let documents = FakeDocuments::with(&[("list", "")]);
        let publisher = FakePublisher::default();
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let sources = Collaborators {
            counts: &counts,
            feed: &feed,
            documents: &documents,
            publisher: &publisher,
            clock: &clock,
        };
        let options = LoopOptions {
            interval: Duration::from_secs(3600),
            once: true,
        };

        let report = run_loop(&store, &sources, &settings(), &options, &Shutdown::new()).await;
        assert_eq!(report.cycles, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(report.last.map(|s| s.add), Some(1));
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn failed_cycle_is_contained() {
        let store = EntityStore::open_in_memory().expect("store");
        let counts = FakeCounts::default();
        let feed = FakeFeed::with(&[]);
        let documents = FakeDocuments::with(&[("list", "/r/foo")]);
        let publisher = FakePublisher::failing();
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let sources = Collaborators {
            counts: &counts,
            feed: &feed,
            documents: &documents,
            publisher: &publisher,
            clock: &clock,
        };
        let options = LoopOptions {
            interval: Duration::from_secs(3600),
            once: true,
        };

        let report = run_loop(&store, &sources, &settings(), &options, &Shutdown::new()).await;
        assert_eq!(report.cycles, 1);
        assert_eq!(report.failures, 1);
        assert!(report.last.is_none());
    }

    #[tokio::test]
    async fn triggered_shutdown_skips_remaining_cycles() {
        let store = EntityStore::open_in_memory().expect("store");
        let counts = FakeCounts::default();
        let feed = FakeFeed::with(&[]);
        let documents = FakeDocuments::with(&[("list", "")]);
        let publisher = FakePublisher::default();
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let sources = Collaborators {
            counts: &counts,
            feed: &feed,
            documents: &documents,
            publisher: &publisher,
            clock: &clock,
        };
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let options = LoopOptions {
            interval: Duration::from_secs(3600),
            once: false,
        };

        let report = run_loop(&store, &sources, &settings(), &options, &shutdown).await;
        assert_eq!(report.cycles, 0);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn trigger_wakes_a_sleeper() {
        let shutdown = Arc::new(Shutdown::new());
        let waker = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waker.trigger();
        });
        tokio::time::timeout(Duration::from_secs(5), shutdown.sleep(Duration::from_secs(3600)))
            .await
            .expect("sleep should end on shutdown");
        handle.await.expect("trigger task");
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn sleep_returns_immediately_once_triggered() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio_test::block_on(shutdown.sleep(Duration::from_secs(3600)));
        assert!(shutdown.is_triggered());
    }
}
