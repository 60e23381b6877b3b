use chrono::{DateTime, Utc};
use trendwatch_core::{PostMetrics, PostRecord};

/// Posts younger than this get a recency boost.
pub const BOOST_WINDOW_HOURS: f64 = 24.0;

/// Boost at age zero, on top of the base score.
pub const MAX_BOOST: f64 = 0.5;

/// Engagement-only part of the score.
pub fn base_score(metrics: &PostMetrics) -> f64 {
    metrics.views as f64
        + 2.0 * metrics.likes as f64
        + 3.0 * metrics.favorites as f64
        + 1.5 * metrics.danmaku as f64
}

/// Multiplier in `[1.0, 1.5]`: 1.5 for a post published at `now`, decaying
/// linearly to 1.0 at 24 hours and staying there. Future publish times are
/// treated as age zero.
pub fn recency_multiplier(posted_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = ((now - posted_at).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
    if age_hours > BOOST_WINDOW_HOURS {
        return 1.0;
    }
    let boost = ((BOOST_WINDOW_HOURS - age_hours) / BOOST_WINDOW_HOURS * MAX_BOOST).max(0.0);
    1.0 + boost
}

/// Popularity score at instant `now`. Posts without a publish time get the
/// base score only.
pub fn hot_score(post: &PostRecord, now: DateTime<Utc>) -> f64 {
    let base = base_score(&post.metrics);
    match post.posted_at {
        Some(posted_at) => base * recency_multiplier(posted_at, now),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_base_score_weights() {
        let metrics = PostMetrics {
            views: 100,
            likes: 10,
            favorites: 5,
            coins: 99,
            danmaku: 4,
        };
        // Coins do not contribute.
        assert_eq!(base_score(&metrics), 100.0 + 20.0 + 15.0 + 6.0);
    }

    #[test]
    fn test_multiplier_midpoint() {
        let m = recency_multiplier(now() - Duration::hours(12), now());
        assert!((m - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_future_post_capped() {
        assert_eq!(recency_multiplier(now() + Duration::hours(3), now()), 1.5);
    }

    #[test]
    fn test_old_post_unboosted() {
        assert_eq!(recency_multiplier(now() - Duration::days(3), now()), 1.0);
    }
}
