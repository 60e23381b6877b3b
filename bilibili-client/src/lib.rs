pub mod api;
pub mod client;
pub mod key_cache;
pub mod metrics;
pub mod retry;
pub mod wbi;


pub use api::{BilibiliApi, BilibiliApiClient, SearchData, SearchVideo};
pub use client::BilibiliClient;
pub use key_cache::{KeyCache, FALLBACK_BUVID3};
pub use metrics::{ApiMetrics, EndpointStats, MetricsCollector};
pub use retry::{RetryConfig, RetryMetrics, RetryStrategy};
pub use wbi::{sign_params, sign_params_at, SignedParams, WbiKeys};
