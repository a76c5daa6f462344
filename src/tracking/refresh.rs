use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrackingConfig;
use crate::store::Entity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    /// Count sits close to the threshold and the short interval has passed.
    NearThreshold,
    /// The long interval has passed, whatever the count.
    Expired,
}

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub threshold: i64,
    pub near_threshold_ratio: f64,
    pub near_threshold_interval: Duration,
    pub default_interval: Duration,
}

impl RefreshPolicy {
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            near_threshold_ratio: 0.05,
            near_threshold_interval: Duration::hours(4),
            default_interval: Duration::hours(24),
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            threshold: config.threshold,
            near_threshold_ratio: config.near_threshold_ratio,
            near_threshold_interval: Duration::hours(i64::from(config.near_threshold_hours)),
            default_interval: Duration::hours(i64::from(config.default_refresh_hours)),
        }
    }

    pub fn is_near_threshold(&self, subscribers: i64) -> bool {
        let threshold = self.threshold as f64;
        let low = threshold * (1.0 - self.near_threshold_ratio);
        let high = threshold * (1.0 + self.near_threshold_ratio);
        let count = subscribers as f64;
        low < count && count < high
    }

    pub fn staleness(&self, entity: &Entity, now: DateTime<Utc>) -> Option<StaleReason> {
        let elapsed = now.signed_duration_since(entity.checked_at);
        if elapsed > self.default_interval {
            return Some(StaleReason::Expired);
        }
        if self.is_near_threshold(entity.subscribers) && elapsed > self.near_threshold_interval {
            return Some(StaleReason::NearThreshold);
        }
        None
    }
}
