use chrono::{DateTime, Duration, Utc};
use trendwatch_core::{DailyDataset, PostRecord};

pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_RANK_LIMIT: usize = 50;

/// True when the post's reference time is at most `window` before `now`.
/// Posts with neither a publish time nor a first sighting never qualify.
pub fn in_window(post: &PostRecord, now: DateTime<Utc>, window: Duration) -> bool {
    post.reference_time()
        .map(|at| now - at <= window)
        .unwrap_or(false)
}

/// Top `limit` posts inside the window, highest score first. Equal scores
/// keep dataset order.
pub fn rank_with(
    dataset: &DailyDataset,
    now: DateTime<Utc>,
    window: Duration,
    limit: usize,
) -> Vec<PostRecord> {
    let mut ranked: Vec<PostRecord> = dataset
        .iter()
        .filter(|post| in_window(post, now, window))
        .cloned()
        .collect();

    ranked.sort_by(|a, b| b.hot_score.total_cmp(&a.hot_score));
    ranked.truncate(limit);
    ranked
}

/// [`rank_with`] using the 24-hour window and top-50 cut.
pub fn rank(dataset: &DailyDataset, now: DateTime<Utc>) -> Vec<PostRecord> {
    rank_with(
        dataset,
        now,
        Duration::hours(DEFAULT_WINDOW_HOURS),
        DEFAULT_RANK_LIMIT,
    )
}
