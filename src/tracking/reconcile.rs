use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::tracking::WorkingSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reconciliation {
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Listed subreddits that fell below the threshold are removed; those above
/// it that the list does not mention yet are added.
pub fn reconcile(working: &WorkingSet, list_subs: &BTreeSet<String>) -> Reconciliation {
    let remove = list_subs
        .iter()
        .filter(|name| working.below().contains(*name))
        .cloned()
        .collect();
    let add = working.above().difference(list_subs).cloned().collect();
    Reconciliation { add, remove }
}
