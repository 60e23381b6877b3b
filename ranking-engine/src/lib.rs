pub mod merge;
pub mod ranking;
pub mod scoring;


pub use merge::{merge_observations, reconcile, MergeStats};
pub use ranking::{in_window, rank, rank_with};
pub use scoring::{base_score, hot_score, recency_multiplier};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use trendwatch_core::{DailyDataset, PostRecord, Settings};

/// Scoring, merging and ranking with a configured window and cut-off.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    window: Duration,
    limit: usize,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self {
            window: Duration::hours(ranking::DEFAULT_WINDOW_HOURS),
            limit: ranking::DEFAULT_RANK_LIMIT,
        }
    }
}

impl RankingEngine {
    pub fn new(window: Duration, limit: usize) -> Self {
        Self { window, limit }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.window(), settings.rank_limit)
    }

    pub fn merge(
        &self,
        observed: Vec<PostRecord>,
        dataset: &mut DailyDataset,
        now: DateTime<Utc>,
    ) -> MergeStats {
        let stats = merge_observations(observed, dataset, now);
        debug!(
            "Merged {} posts ({} new, {} updated), dataset size {}",
            stats.total(),
            stats.inserted,
            stats.updated,
            dataset.len()
        );
        stats
    }

    pub fn rank(&self, dataset: &DailyDataset, now: DateTime<Utc>) -> Vec<PostRecord> {
        rank_with(dataset, now, self.window, self.limit)
    }
}
