pub mod builder;
pub mod csv;
pub mod json;
pub mod table;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::Entity;
use crate::tracking::{classify, Classification, RefreshPolicy, StaleReason};

pub use builder::{build_delta_report, build_listing_report, ReportBuilder, ReportLine};

/// A stored entity as the inspection commands show it.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRow {
    pub name: String,
    pub subscribers: i64,
    pub checked_at: DateTime<Utc>,
    pub classification: Classification,
    pub stale: Option<StaleReason>,
}

pub fn entity_rows(
    entities: &[Entity],
    policy: &RefreshPolicy,
    now: DateTime<Utc>,
) -> Vec<EntityRow> {
    entities
        .iter()
        .map(|entity| EntityRow {
            name: entity.name.clone(),
            subscribers: entity.subscribers,
            checked_at: entity.checked_at,
            classification: classify(entity.subscribers, policy.threshold),
            stale: policy.staleness(entity, now),
        })
        .collect()
}
