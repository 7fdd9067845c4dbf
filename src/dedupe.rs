//! Set-based deduplication: which window ids have no derived rows in the
//! destination store yet. Pure; the id scans live in `source` and `load`.

use crate::category::Category;
use ahash::AHashSet;
use std::collections::BTreeMap;

/// `window − existing`, sorted ascending so downstream filename generation
/// and batching are reproducible within a run.
pub fn pending_ids(window: &AHashSet<i64>, existing: &AHashSet<i64>) -> Vec<i64> {
    let mut pending: Vec<i64> = window.difference(existing).copied().collect();
    pending.sort_unstable();
    pending
}

/// Per-category pending sets. Categories missing from `window_ids` are
/// treated as empty. The `BTreeMap` keeps category iteration stable.
pub fn pending_by_category(
    window_ids: &BTreeMap<Category, AHashSet<i64>>,
    existing_ids: &BTreeMap<Category, AHashSet<i64>>,
) -> BTreeMap<Category, Vec<i64>> {
    let empty = AHashSet::new();
    window_ids
        .iter()
        .map(|(&category, window)| {
            let existing = existing_ids.get(&category).unwrap_or(&empty);
            (category, pending_ids(window, existing))
        })
        .collect()
}

/// True when every category's pending set is empty: the window is fully
/// exported and the run can terminate successfully without writing anything.
pub fn fully_exported(pending: &BTreeMap<Category, Vec<i64>>) -> bool {
    pending.values().all(|ids| ids.is_empty())
}
