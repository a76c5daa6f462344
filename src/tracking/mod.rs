pub mod classify;
pub mod reconcile;
pub mod refresh;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

pub use classify::{classify, Classification};
pub use reconcile::{reconcile, Reconciliation};
pub use refresh::{RefreshPolicy, StaleReason};

/// Counts gathered during one cycle, split into the subreddits that clear
/// the threshold and the ones that don't. Every recorded name sits in
/// exactly one of the two sets.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingSet {
    threshold: i64,
    all_counts: BTreeMap<String, i64>,
    above: BTreeSet<String>,
    below: BTreeSet<String>,
}

impl WorkingSet {
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            all_counts: BTreeMap::new(),
            above: BTreeSet::new(),
            below: BTreeSet::new(),
        }
    }

    pub fn record(&mut self, name: &str, subscribers: i64) -> Classification {
        let class = classify(subscribers, self.threshold);
        self.all_counts.insert(name.to_string(), subscribers);
        match class {
            Classification::Above => {
                self.below.remove(name);
                self.above.insert(name.to_string());
            }
            Classification::Below => {
                self.above.remove(name);
                self.below.insert(name.to_string());
            }
        }
        class
    }

    pub fn contains(&self, name: &str) -> bool {
        self.all_counts.contains_key(name)
    }

    pub fn count(&self, name: &str) -> Option<i64> {
        self.all_counts.get(name).copied()
    }

    pub fn above(&self) -> &BTreeSet<String> {
        &self.above
    }

    pub fn below(&self) -> &BTreeSet<String> {
        &self.below
    }

    pub fn len(&self) -> usize {
        self.all_counts.len()
    }
}
