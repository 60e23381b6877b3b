use crate::scoring::hot_score;
use chrono::{DateTime, Utc};
use serde::Serialize;
use trendwatch_core::{DailyDataset, PostRecord};

/// Outcome of folding one batch of observations into a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Combines a fresh observation with the stored record for the same uid.
///
/// Every field comes from `observed` except `first_seen`, which keeps the
/// stored value (or becomes `now` for a new post). `last_seen` is `now` and
/// `hot_score` is recomputed at `now`.
pub fn reconcile(
    existing: Option<&PostRecord>,
    observed: PostRecord,
    now: DateTime<Utc>,
) -> PostRecord {
    let first_seen = existing.and_then(|post| post.first_seen).unwrap_or(now);

    let mut merged = observed;
    merged.first_seen = Some(first_seen);
    merged.last_seen = Some(now);
    merged.hot_score = hot_score(&merged, now);
    merged
}

/// Folds `observed` into `dataset` in order.
pub fn merge_observations(
    observed: impl IntoIterator<Item = PostRecord>,
    dataset: &mut DailyDataset,
    now: DateTime<Utc>,
) -> MergeStats {
    let mut stats = MergeStats::default();

    for post in observed {
        let merged = reconcile(dataset.get(&post.uid), post, now);
        if dataset.upsert(merged) {
            stats.inserted += 1;
        } else {
            stats.updated += 1;
        }
    }

    stats
}
