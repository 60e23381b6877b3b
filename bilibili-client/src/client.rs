use crate::api::{BilibiliApi, BilibiliApiClient};
use crate::key_cache::KeyCache;
use crate::metrics::MetricsCollector;
use crate::retry::{calculate_delay, get_retry_strategy, RetryConfig, RetryMetrics, RetryStrategy};
use crate::wbi::{sign_params_at, WbiKeys};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use trendwatch_core::{
    BilibiliApiError, Clock, CoreError, PostRecord, PostSource, SearchOptions, Settings,
};

/// Keyword search against Bilibili with cached signing keys and bounded retry.
pub struct BilibiliClient {
    api: Arc<dyn BilibiliApi>,
    cache: tokio::sync::Mutex<KeyCache>,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
    search_window: chrono::Duration,
    retry_metrics: Mutex<RetryMetrics>,
    api_metrics: Option<Arc<MetricsCollector>>,
}

impl BilibiliClient {
    pub fn new(settings: &Settings, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        let api = BilibiliApiClient::new(settings.request_timeout())?;
        let api_metrics = api.metrics();

        let mut client = Self::with_api(Arc::new(api), clock, settings);
        client.api_metrics = Some(api_metrics);
        Ok(client)
    }

    pub fn with_api(api: Arc<dyn BilibiliApi>, clock: Arc<dyn Clock>, settings: &Settings) -> Self {
        Self {
            api,
            cache: tokio::sync::Mutex::new(KeyCache::new(clock.clone(), settings.key_ttl())),
            clock,
            retry: RetryConfig::from_settings(settings),
            search_window: settings.window(),
            retry_metrics: Mutex::new(RetryMetrics::default()),
            api_metrics: None,
        }
    }

    /// Per-endpoint request metrics, when backed by the HTTP client.
    pub fn api_metrics(&self) -> Option<Arc<MetricsCollector>> {
        self.api_metrics.clone()
    }

    pub fn retry_metrics(&self) -> RetryMetrics {
        self.retry_metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_retry(&self, update: impl FnOnce(&mut RetryMetrics)) {
        update(&mut self.retry_metrics.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Searches one keyword. Never fails: every error path is logged and
    /// yields an empty list.
    pub async fn search(&self, keyword: &str, options: &SearchOptions) -> Vec<PostRecord> {
        match self.search_with_retry(keyword, options).await {
            Ok(posts) => {
                info!("Keyword {:?} returned {} videos", keyword, posts.len());
                posts
            }
            Err(e) => {
                error!("Search for keyword {:?} failed: {}", keyword, e);
                Vec::new()
            }
        }
    }

    /// Like [`search`](Self::search) but surfaces transport failures once
    /// retries are exhausted. Application-level error codes still degrade to
    /// an empty list.
    pub async fn search_with_retry(
        &self,
        keyword: &str,
        options: &SearchOptions,
    ) -> Result<Vec<PostRecord>, CoreError> {
        let params = self.build_params(keyword, options, self.clock.now());
        let mut signature_rejections = 0u32;
        let mut transport_retries = 0u32;

        loop {
            let (mixin_key, buvid3) = {
                let mut cache = self.cache.lock().await;
                let mixin_key = self.ensure_keys(&mut cache).await?;
                let buvid3 = self.ensure_buvid3(&mut cache).await;
                (mixin_key, buvid3)
            };

            let signed = sign_params_at(&params, &mixin_key, self.clock.now().timestamp());
            debug!("Searching {:?} (w_rid={})", keyword, signed.w_rid());

            let error = match self.api.search(&signed, &buvid3).await {
                Ok(data) => {
                    return Ok(data
                        .into_videos()
                        .into_iter()
                        .map(|video| video.into_post(keyword))
                        .collect());
                }
                Err(error) => error,
            };

            match get_retry_strategy(&error) {
                RetryStrategy::RefreshKeysAndRetry => {
                    signature_rejections += 1;
                    if signature_rejections >= self.retry.max_attempts {
                        warn!(
                            "Signature still rejected for {:?} after {} attempts, giving up",
                            keyword, signature_rejections
                        );
                        self.record_retry(|m| m.exhausted += 1);
                        return Ok(Vec::new());
                    }
                    warn!(
                        "Signature rejected for {:?}, refreshing keys and retrying ({}/{})",
                        keyword,
                        signature_rejections,
                        self.retry.max_attempts - 1
                    );
                    self.cache.lock().await.expire_keys();
                    self.record_retry(|m| m.key_refreshes += 1);
                }
                RetryStrategy::Degrade => {
                    warn!("Search for {:?} returned an API error: {}", keyword, error);
                    self.record_retry(|m| m.degraded += 1);
                    return Ok(Vec::new());
                }
                RetryStrategy::Retry => {
                    transport_retries += 1;
                    if transport_retries > self.retry.max_attempts {
                        self.record_retry(|m| m.exhausted += 1);
                        return Err(error);
                    }
                    let delay = calculate_delay(transport_retries, &self.retry);
                    info!(
                        "Retrying {:?} in {:?} due to: {} ({}/{})",
                        keyword, delay, error, transport_retries, self.retry.max_attempts
                    );
                    self.record_retry(|m| m.transport_retries += 1);
                    sleep(delay).await;
                }
                RetryStrategy::NoRetry => return Err(error),
            }
        }
    }

    fn build_params(
        &self,
        keyword: &str,
        options: &SearchOptions,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let pubdate_from = (now - self.search_window).timestamp();

        BTreeMap::from([
            ("search_type".to_string(), "video".to_string()),
            ("keyword".to_string(), keyword.to_string()),
            ("order".to_string(), options.order.as_param().to_string()),
            ("page".to_string(), options.page.to_string()),
            ("pagesize".to_string(), options.page_size.to_string()),
            ("duration".to_string(), options.duration.to_string()),
            ("tids".to_string(), options.tids.to_string()),
            ("pubdate_from".to_string(), pubdate_from.to_string()),
        ])
    }

    /// Returns the mixin key, refreshing the token pair when stale. A failed
    /// refresh falls back to stale keys and only errors when none exist.
    async fn ensure_keys(&self, cache: &mut KeyCache) -> Result<String, CoreError> {
        if cache.keys_need_refresh() {
            info!("Refreshing WBI keys");
            match self.api.fetch_wbi_keys().await {
                Ok(keys) => {
                    cache.store_keys(keys);
                    info!("WBI keys refreshed");
                }
                Err(e) if cache.keys().is_some() => {
                    warn!("WBI key refresh failed, keeping stale keys: {}", e);
                }
                Err(e) => {
                    error!("WBI key refresh failed with no cached keys: {}", e);
                    return Err(e);
                }
            }
        }

        cache.keys().map(WbiKeys::mixin_key).ok_or_else(|| {
            BilibiliApiError::KeyFetchFailed {
                reason: "no signing keys available".to_string(),
            }
            .into()
        })
    }

    async fn ensure_buvid3(&self, cache: &mut KeyCache) -> String {
        if cache.buvid3_needs_refresh() {
            match self.api.fetch_buvid3().await {
                Ok(buvid3) => {
                    debug!("buvid3 refreshed");
                    cache.store_buvid3(buvid3);
                }
                Err(e) => {
                    // Keep whatever we had (or the placeholder) until the next TTL expiry.
                    warn!("buvid3 fetch failed, reusing {}: {}", cache.buvid3(), e);
                    let current = cache.buvid3().to_string();
                    cache.store_buvid3(current);
                }
            }
        }
        cache.buvid3().to_string()
    }
}

#[async_trait]
impl PostSource for BilibiliClient {
    async fn search(
        &self,
        keyword: &str,
        options: &SearchOptions,
    ) -> Result<Vec<PostRecord>, CoreError> {
        Ok(BilibiliClient::search(self, keyword, options).await)
    }
}
