use crate::wbi::WbiKeys;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use trendwatch_core::Clock;

/// Placeholder session id sent when the real one cannot be obtained.
pub const FALLBACK_BUVID3: &str = "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX";

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: DateTime<Utc>,
    expired: bool,
}

impl<T> Cached<T> {
    fn new(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            fetched_at,
            expired: false,
        }
    }
}

/// Signing keys and session id, each with its own freshness timestamp.
///
/// A signature rejection only invalidates the keys; the session id keeps
/// its own TTL.
pub struct KeyCache {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    keys: Option<Cached<WbiKeys>>,
    buvid3: Option<Cached<String>>,
}

impl KeyCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            keys: None,
            buvid3: None,
        }
    }

    fn is_stale<T>(&self, entry: &Option<Cached<T>>) -> bool {
        match entry {
            None => true,
            Some(cached) if cached.expired => true,
            Some(cached) => {
                let age = self.clock.now() - cached.fetched_at;
                age.to_std().map(|age| age > self.ttl).unwrap_or(false)
            }
        }
    }

    /// True when no keys are cached or the cached pair is older than the TTL.
    pub fn keys_need_refresh(&self) -> bool {
        self.is_stale(&self.keys)
    }

    pub fn keys(&self) -> Option<&WbiKeys> {
        self.keys.as_ref().map(|c| &c.value)
    }

    pub fn store_keys(&mut self, keys: WbiKeys) {
        self.keys = Some(Cached::new(keys, self.clock.now()));
    }

    /// Marks the keys as expired while keeping them usable as a stale
    /// fallback if the refresh fails.
    pub fn expire_keys(&mut self) {
        if let Some(cached) = self.keys.as_mut() {
            cached.expired = true;
        }
    }

    pub fn buvid3_needs_refresh(&self) -> bool {
        self.is_stale(&self.buvid3)
    }

    pub fn buvid3(&self) -> &str {
        self.buvid3
            .as_ref()
            .map(|c| c.value.as_str())
            .unwrap_or(FALLBACK_BUVID3)
    }

    pub fn store_buvid3(&mut self, buvid3: String) {
        self.buvid3 = Some(Cached::new(buvid3, self.clock.now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trendwatch_core::ManualClock;

    fn keys() -> WbiKeys {
        WbiKeys {
            img_key: "img".to_string(),
            sub_key: "sub".to_string(),
        }
    }

    fn cache() -> (Arc<ManualClock>, KeyCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap(),
        ));
        let cache = KeyCache::new(clock.clone(), Duration::from_secs(3600));
        (clock, cache)
    }

    #[test]
    fn test_empty_cache_needs_refresh() {
        let (_, cache) = cache();
        assert!(cache.keys_need_refresh());
        assert!(cache.keys().is_none());
        assert_eq!(cache.buvid3(), FALLBACK_BUVID3);
    }

    #[test]
    fn test_keys_expire_after_ttl() {
        let (clock, mut cache) = cache();
        cache.store_keys(keys());
        assert!(!cache.keys_need_refresh());

        clock.advance(chrono::Duration::minutes(60));
        assert!(!cache.keys_need_refresh());

        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.keys_need_refresh());
        // Stale keys remain available until replaced.
        assert_eq!(cache.keys(), Some(&keys()));
    }

    #[test]
    fn test_expire_keys_leaves_session_id_alone() {
        let (_, mut cache) = cache();
        cache.store_keys(keys());
        cache.store_buvid3("real-buvid".to_string());

        cache.expire_keys();
        assert!(cache.keys_need_refresh());
        assert!(cache.keys().is_some());
        assert!(!cache.buvid3_needs_refresh());
        assert_eq!(cache.buvid3(), "real-buvid");
    }
}
