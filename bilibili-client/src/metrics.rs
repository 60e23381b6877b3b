use crate::api::SIGNATURE_REJECTED_CODE;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// What happened to one HTTP round trip.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub endpoint: String,
    pub http_status: Option<u16>,
    /// The body's `code` field, when the body was an API envelope.
    pub api_code: Option<i64>,
    pub latency: Duration,
    /// Error code of the failure, `None` on success.
    pub failure: Option<String>,
}

impl RequestRecord {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.api_code.map_or(true, |code| code == 0)
    }

    fn signature_rejected(&self) -> bool {
        self.api_code == Some(SIGNATURE_REJECTED_CODE) || self.http_status == Some(412)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointStats {
    pub requests: u64,
    pub failures: u64,
    pub total_latency: Duration,
    pub fastest: Option<Duration>,
    pub slowest: Option<Duration>,
}

impl EndpointStats {
    fn add(&mut self, record: &RequestRecord) {
        self.requests += 1;
        if !record.succeeded() {
            self.failures += 1;
        }
        self.total_latency += record.latency;
        self.fastest = Some(self.fastest.map_or(record.latency, |d| d.min(record.latency)));
        self.slowest = Some(self.slowest.map_or(record.latency, |d| d.max(record.latency)));
    }

    pub fn mean_latency(&self) -> Duration {
        match u32::try_from(self.requests) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_latency / n,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }
}

/// Counters across every endpoint the client talks to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub signature_rejections: u64,
    pub last_request_at: Option<DateTime<Utc>>,
    pub endpoints: BTreeMap<String, EndpointStats>,
}

impl ApiMetrics {
    pub fn successful_requests(&self) -> u64 {
        self.total_requests - self.failed_requests
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, record: RequestRecord) {
        let mut metrics = self.metrics.write().await;

        metrics.total_requests += 1;
        metrics.last_request_at = Some(Utc::now());
        if !record.succeeded() {
            metrics.failed_requests += 1;
        }
        if record.signature_rejected() {
            metrics.signature_rejections += 1;
        }

        metrics
            .endpoints
            .entry(record.endpoint.clone())
            .or_default()
            .add(&record);
    }

    pub async fn snapshot(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn endpoint(&self, endpoint: &str) -> Option<EndpointStats> {
        self.metrics.read().await.endpoints.get(endpoint).cloned()
    }

    pub async fn reset(&self) {
        *self.metrics.write().await = ApiMetrics::default();
    }

    pub async fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SEARCH_ENDPOINT;

    fn search(api_code: Option<i64>, millis: u64) -> RequestRecord {
        RequestRecord {
            endpoint: SEARCH_ENDPOINT.to_string(),
            http_status: Some(200),
            api_code,
            latency: Duration::from_millis(millis),
            failure: None,
        }
    }

    #[tokio::test]
    async fn test_successful_request_counted() {
        let collector = MetricsCollector::new();
        collector.record(search(Some(0), 150)).await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_requests(), 1);
        assert!(metrics.last_request_at.is_some());
    }

    #[tokio::test]
    async fn test_signature_rejections_and_endpoint_stats() {
        let collector = MetricsCollector::new();
        collector.record(search(Some(-412), 100)).await;
        collector.record(search(Some(0), 300)).await;
        collector
            .record(RequestRecord {
                endpoint: "/x/web-interface/nav".to_string(),
                http_status: None,
                api_code: None,
                latency: Duration::from_secs(30),
                failure: Some("TIMEOUT".to_string()),
            })
            .await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.signature_rejections, 1);
        assert_eq!(metrics.failed_requests, 2);
        assert_eq!(metrics.endpoints.len(), 2);

        let stats = collector.endpoint(SEARCH_ENDPOINT).await.unwrap();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.failure_rate(), 0.5);
        assert_eq!(stats.mean_latency(), Duration::from_millis(200));
        assert_eq!(stats.fastest, Some(Duration::from_millis(100)));
        assert_eq!(stats.slowest, Some(Duration::from_millis(300)));
    }

    #[tokio::test]
    async fn test_json_export_and_reset() {
        let collector = MetricsCollector::new();
        collector.record(search(Some(0), 150)).await;

        let exported = collector.to_json().await.unwrap();
        assert!(exported.contains("signature_rejections"));

        collector.reset().await;
        assert_eq!(collector.snapshot().await.total_requests, 0);
    }
}
