use std::time::Instant;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::discovery::{discover_from_feed, discover_from_list, scan_list_pages};
use crate::reddit::Collaborators;
use crate::report::{build_delta_report, build_listing_report};
use crate::store::EntityStore;
use crate::tracking::{reconcile, RefreshPolicy, WorkingSet};

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub policy: RefreshPolicy,
    pub sample_limit: usize,
    pub list_pages: Vec<String>,
    pub report_page: String,
    pub listing_page: Option<String>,
    pub dry_run: bool,
}

impl CycleSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            policy: RefreshPolicy::from_config(&config.tracking),
            sample_limit: config.tracking.sample_limit,
            list_pages: config
                .wiki
                .list_pages
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            report_page: config.wiki.report_page.clone(),
            listing_page: config
                .wiki
                .listing_page
                .clone()
                .filter(|p| !p.trim().is_empty()),
            dry_run,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CycleSummary {
    pub refreshed: usize,
    pub discovered_from_feed: usize,
    pub discovered_from_list: usize,
    pub above: usize,
    pub below: usize,
    pub add: usize,
    pub remove: usize,
    pub pages_skipped: Vec<String>,
    pub published: Vec<String>,
}

/// One full pass: refresh stale counts, fold in new names from the feed and
/// the list pages, reconcile, render and publish.
pub async fn run_cycle(
    store: &EntityStore,
    sources: &Collaborators<'_>,
    settings: &CycleSettings,
) -> Result<CycleSummary> {
    let started = Instant::now();
    let now = sources.clock.now();
    let mut summary = CycleSummary::default();
    let mut working = WorkingSet::new(settings.policy.threshold);

    for entity in store.list_all().context("failed loading stored subreddits")? {
        let subscribers = match settings.policy.staleness(&entity, now) {
            Some(reason) => {
                let fresh = sources.counts.subscriber_count(&entity.name).await;
                debug!(
                    "/r/{} from {} to {} ({reason:?})",
                    entity.name, entity.subscribers, fresh
                );
                store
                    .update(&entity.name, fresh, sources.clock.now())
                    .with_context(|| format!("failed updating /r/{}", entity.name))?;
                summary.refreshed += 1;
                fresh
            }
            None => entity.subscribers,
        };
        working.record(&entity.name, subscribers);
    }

    summary.discovered_from_feed =
        discover_from_feed(store, sources, &mut working, settings.sample_limit).await?;

    let scan = scan_list_pages(sources.documents, &settings.list_pages).await;
    summary.pages_skipped = scan.pages_skipped.clone();
    // With no list at all every tracked name would look like an addition.
    if scan.pages_loaded.is_empty() {
        bail!(
            "none of the list pages could be loaded ({})",
            scan.pages_skipped.join(", ")
        );
    }
    summary.discovered_from_list = discover_from_list(store, sources, &mut working, &scan).await?;

    let list_subs = scan.list_subs();
    let reconciliation = reconcile(&working, &list_subs);
    summary.above = working.above().len();
    summary.below = working.below().len();
    summary.add = reconciliation.add.len();
    summary.remove = reconciliation.remove.len();
    info!(
        "{} over / {} under | {} add / {} remove",
        summary.above, summary.below, summary.add, summary.remove
    );
    if reconciliation.is_empty() {
        debug!("list already matches the threshold");
    }

    // The delta page goes last so it only appears once the listing it is
    // read against is in place.
    let rendered_at = sources.clock.now();
    let mut documents = Vec::new();
    if let Some(page) = &settings.listing_page {
        documents.push((
            page.clone(),
            build_listing_report(rendered_at, &scan.alphabetized(), &working).render(),
        ));
    }
    documents.push((
        settings.report_page.clone(),
        build_delta_report(rendered_at, &reconciliation, &working).render(),
    ));

    for (page, text) in documents {
        if settings.dry_run {
            debug!("dry run, not publishing {page}:\n{text}");
            continue;
        }
        if let Err(err) = sources.publisher.publish(&page, &text).await {
            let done = if summary.published.is_empty() {
                "nothing".to_string()
            } else {
                summary.published.join(", ")
            };
            return Err(anyhow::Error::new(err).context(format!(
                "failed publishing wiki page {page} (already published: {done})"
            )));
        }
        info!("published wiki page {page}");
        summary.published.push(page);
    }

    info!("run complete after {}s", started.elapsed().as_secs());
    Ok(summary)
}
