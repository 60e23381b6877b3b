use crate::metrics::{MetricsCollector, RequestRecord};
use crate::wbi::{SignedParams, WbiKeys};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use trendwatch_core::{BilibiliApiError, CoreError, ErrorExt, PostMetrics, PostRecord};

const BILIBILI_API_BASE: &str = "https://api.bilibili.com";
pub const NAV_ENDPOINT: &str = "/x/web-interface/nav";
pub const SPI_ENDPOINT: &str = "/x/frontend/finger/spi";
pub const SEARCH_ENDPOINT: &str = "/x/web-interface/search/type";

/// Response code for a refused WBI signature.
pub const SIGNATURE_REJECTED_CODE: i64 = -412;

pub const PLATFORM_TAG: &str = "B站";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";
const SITE_REFERER: &str = "https://www.bilibili.com/";
const SEARCH_REFERER: &str = "https://search.bilibili.com/";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Maps a non-zero `code` onto the error taxonomy.
    pub fn into_result(self) -> Result<Option<T>, CoreError> {
        match self.code {
            0 => Ok(self.data),
            SIGNATURE_REJECTED_CODE => Err(BilibiliApiError::SignatureRejected { code: self.code }.into()),
            code => Err(BilibiliApiError::ApiError {
                code,
                message: self.message,
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavData {
    pub wbi_img: WbiImg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WbiImg {
    pub img_url: String,
    pub sub_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpiData {
    pub b_3: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub result: Option<Vec<SearchVideo>>,
}

impl SearchData {
    pub fn into_videos(self) -> Vec<SearchVideo> {
        self.result.unwrap_or_default()
    }
}

/// One hit from a `search_type=video` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchVideo {
    #[serde(default)]
    pub bvid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub arcurl: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub pubdate: Option<u64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub play: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub like: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub favourite: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub favorites: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub coin: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub danmaku: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub video_review: Option<u64>,
}

/// Counts arrive as numbers, numeric strings, or null depending on the field.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Removes the `<em class="keyword">` highlight markup the search endpoint
/// wraps around matched terms.
pub fn strip_highlight(title: &str) -> String {
    title.replace("<em class=\"keyword\">", "").replace("</em>", "")
}

/// Resolves protocol-relative links (`//www.bilibili.com/...`) to https.
pub fn absolute_url(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        format!("https://{}", url.trim_start_matches('/'))
    }
}

impl SearchVideo {
    pub fn into_post(self, keyword: &str) -> PostRecord {
        let tags = self
            .tag
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let posted_at = self
            .pubdate
            .filter(|&ts| ts > 0)
            .and_then(|ts| DateTime::from_timestamp(ts as i64, 0));

        PostRecord {
            uid: format!("bilibili_{}", self.bvid),
            platform: PLATFORM_TAG.to_string(),
            url: absolute_url(&self.arcurl),
            title: strip_highlight(&self.title),
            author: self.author,
            posted_at,
            content_snippet: self.description,
            tags,
            metrics: PostMetrics {
                views: self.play.unwrap_or(0),
                likes: self.like.unwrap_or(0),
                favorites: self.favourite.or(self.favorites).unwrap_or(0),
                coins: self.coin.unwrap_or(0),
                danmaku: self.danmaku.or(self.video_review).unwrap_or(0),
            },
            keyword_matched: keyword.to_string(),
            hot_score: 0.0,
            first_seen: None,
            last_seen: None,
        }
    }
}

/// Remote operations the search client depends on.
#[async_trait]
pub trait BilibiliApi: Send + Sync {
    /// Fetches the current WBI token pair from the nav endpoint.
    async fn fetch_wbi_keys(&self) -> Result<WbiKeys, CoreError>;

    /// Fetches a `buvid3` session identifier.
    async fn fetch_buvid3(&self) -> Result<String, CoreError>;

    /// Runs one signed video search. Non-zero response codes come back as
    /// errors (`SignatureRejected` for -412).
    async fn search(&self, params: &SignedParams, buvid3: &str) -> Result<SearchData, CoreError>;
}

#[derive(Debug)]
pub struct BilibiliApiClient {
    http_client: Client,
    metrics: Arc<MetricsCollector>,
    base_url: String,
}

impl BilibiliApiClient {
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        default_headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let http_client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            metrics: Arc::new(MetricsCollector::new()),
            base_url: BILIBILI_API_BASE.to_string(),
        })
    }

    /// Points the client at a different host, e.g. a local stub server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        referer: &str,
        buvid3: Option<&str>,
    ) -> Result<ApiEnvelope<T>, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .get(&url)
            .query(query)
            .header(header::REFERER, referer);
        if let Some(buvid3) = buvid3 {
            request_builder = request_builder.header(header::COOKIE, format!("buvid3={}", buvid3));
        }

        debug!("Making Bilibili API request: GET {}", endpoint);
        let (status_code, result) = Self::execute::<T>(request_builder, endpoint).await;

        let (api_code, failure) = match &result {
            Ok(envelope) => (Some(envelope.code), None),
            Err(CoreError::BilibiliApi(BilibiliApiError::SignatureRejected { code })) => {
                (Some(*code), Some("SIGNATURE_REJECTED".to_string()))
            }
            Err(e) => (None, Some(e.error_code())),
        };

        self.metrics
            .record(RequestRecord {
                endpoint: endpoint.to_string(),
                http_status: status_code,
                api_code,
                latency: start_time.elapsed(),
                failure,
            })
            .await;

        result
    }

    async fn execute<T: DeserializeOwned>(
        request_builder: RequestBuilder,
        endpoint: &str,
    ) -> (Option<u16>, Result<ApiEnvelope<T>, CoreError>) {
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for GET {}: {}", endpoint, e);
                let err = if e.is_timeout() {
                    CoreError::BilibiliApi(BilibiliApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                };
                return (None, Err(err));
            }
        };

        let status = response.status();
        let status_code = Some(status.as_u16());

        if status == StatusCode::PRECONDITION_FAILED {
            // Risk control answers with HTTP 412 and an HTML body.
            warn!("Request to {} rejected with HTTP 412", endpoint);
            return (
                status_code,
                Err(BilibiliApiError::SignatureRejected {
                    code: SIGNATURE_REJECTED_CODE,
                }
                .into()),
            );
        }

        if !status.is_success() {
            error!("Request failed with status: {} for {}", status, endpoint);
            return (
                status_code,
                Err(BilibiliApiError::ServerError {
                    status_code: status.as_u16(),
                }
                .into()),
            );
        }

        let envelope = response.json::<ApiEnvelope<T>>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            if e.is_timeout() {
                CoreError::BilibiliApi(BilibiliApiError::RequestTimeout)
            } else {
                CoreError::BilibiliApi(BilibiliApiError::InvalidResponse {
                    details: format!("Failed to parse response from {}", endpoint),
                })
            }
        });

        (status_code, envelope)
    }
}

#[async_trait]
impl BilibiliApi for BilibiliApiClient {
    async fn fetch_wbi_keys(&self) -> Result<WbiKeys, CoreError> {
        // The nav endpoint reports -101 (not logged in) but still carries the keys.
        let envelope: ApiEnvelope<NavData> = self
            .get_envelope(NAV_ENDPOINT, &[], SITE_REFERER, None)
            .await?;

        let nav = envelope.data.ok_or_else(|| BilibiliApiError::KeyFetchFailed {
            reason: format!("nav response without data (code {})", envelope.code),
        })?;

        let keys = WbiKeys::from_urls(&nav.wbi_img.img_url, &nav.wbi_img.sub_url).ok_or_else(
            || BilibiliApiError::KeyFetchFailed {
                reason: format!(
                    "unexpected key urls: {} / {}",
                    nav.wbi_img.img_url, nav.wbi_img.sub_url
                ),
            },
        )?;

        debug!("Retrieved WBI keys");
        Ok(keys)
    }

    async fn fetch_buvid3(&self) -> Result<String, CoreError> {
        let envelope: ApiEnvelope<SpiData> = self
            .get_envelope(SPI_ENDPOINT, &[], SITE_REFERER, None)
            .await?;

        match envelope.into_result()? {
            Some(spi) if !spi.b_3.is_empty() => Ok(spi.b_3),
            _ => Err(BilibiliApiError::InvalidResponse {
                details: "spi response without b_3".to_string(),
            }
            .into()),
        }
    }

    async fn search(&self, params: &SignedParams, buvid3: &str) -> Result<SearchData, CoreError> {
        let query = params.as_query();
        let envelope: ApiEnvelope<SearchData> = self
            .get_envelope(SEARCH_ENDPOINT, &query, SEARCH_REFERER, Some(buvid3))
            .await?;

        let data = envelope.into_result()?.unwrap_or_default();
        info!(
            "Retrieved {} videos for keyword {:?}",
            data.result.as_ref().map_or(0, Vec::len),
            params.get("keyword").unwrap_or_default()
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_hit() -> serde_json::Value {
        serde_json::json!({
            "type": "video",
            "bvid": "BV1xx411c7mD",
            "title": "2025<em class=\"keyword\">秋招</em>面经合集",
            "author": "面试官小王",
            "arcurl": "//www.bilibili.com/video/BV1xx411c7mD",
            "pubdate": 1725177600,
            "description": "整理了今年的面经",
            "tag": "秋招,面试,,offer",
            "play": 12345,
            "like": "678",
            "favorites": 90,
            "coin": 12,
            "video_review": 34
        })
    }

    #[tokio::test]
    async fn test_api_client_creation() {
        let client = BilibiliApiClient::new(Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, BILIBILI_API_BASE);

        let client = client.with_base_url("http://127.0.0.1:9/");
        assert_eq!(client.base_url, "http://127.0.0.1:9");

        let metrics = client.metrics().snapshot().await;
        assert_eq!(metrics.total_requests, 0);
    }

    #[test]
    fn test_search_video_to_post() {
        let video: SearchVideo = serde_json::from_value(sample_hit()).unwrap();
        let post = video.into_post("秋招");

        assert_eq!(post.uid, "bilibili_BV1xx411c7mD");
        assert_eq!(post.platform, "B站");
        assert_eq!(post.title, "2025秋招面经合集");
        assert_eq!(post.url, "https://www.bilibili.com/video/BV1xx411c7mD");
        assert_eq!(
            post.posted_at,
            Some(Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(post.tags, vec!["秋招", "面试", "offer"]);
        assert_eq!(post.metrics.views, 12345);
        assert_eq!(post.metrics.likes, 678);
        assert_eq!(post.metrics.favorites, 90);
        assert_eq!(post.metrics.coins, 12);
        assert_eq!(post.metrics.danmaku, 34);
        assert_eq!(post.keyword_matched, "秋招");
        assert!(post.first_seen.is_none());
    }

    #[test]
    fn test_favourite_spelling_wins() {
        let mut hit = sample_hit();
        hit["favourite"] = serde_json::json!(7);
        hit["danmaku"] = serde_json::json!(3);
        let video: SearchVideo = serde_json::from_value(hit).unwrap();
        let post = video.into_post("offer");
        assert_eq!(post.metrics.favorites, 7);
        assert_eq!(post.metrics.danmaku, 3);
    }

    #[test]
    fn test_sparse_hit_defaults() {
        let video: SearchVideo =
            serde_json::from_value(serde_json::json!({ "bvid": "BV1", "play": null })).unwrap();
        let post = video.into_post("offer");
        assert_eq!(post.metrics, PostMetrics::default());
        assert!(post.posted_at.is_none());
        assert!(post.tags.is_empty());
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("https://b23.tv/x"), "https://b23.tv/x");
        assert_eq!(absolute_url("http://b23.tv/x"), "http://b23.tv/x");
        assert_eq!(
            absolute_url("//www.bilibili.com/video/BV1"),
            "https://www.bilibili.com/video/BV1"
        );
    }

    #[test]
    fn test_envelope_codes() {
        let ok: ApiEnvelope<SearchData> =
            serde_json::from_str(r#"{"code":0,"message":"0","data":{"result":[]}}"#).unwrap();
        assert!(ok.into_result().unwrap().is_some());

        let rejected: ApiEnvelope<SearchData> =
            serde_json::from_str(r#"{"code":-412,"message":"请求被拦截"}"#).unwrap();
        assert!(matches!(
            rejected.into_result(),
            Err(CoreError::BilibiliApi(BilibiliApiError::SignatureRejected { code: -412 }))
        ));

        let degraded: ApiEnvelope<SearchData> =
            serde_json::from_str(r#"{"code":-400,"message":"请求错误"}"#).unwrap();
        assert!(matches!(
            degraded.into_result(),
            Err(CoreError::BilibiliApi(BilibiliApiError::ApiError { code: -400, .. }))
        ));
    }

    #[test]
    fn test_nav_payload_parses_without_login() {
        let envelope: ApiEnvelope<NavData> = serde_json::from_value(serde_json::json!({
            "code": -101,
            "message": "账号未登录",
            "data": {
                "isLogin": false,
                "wbi_img": {
                    "img_url": "https://i0.hdslb.com/bfs/wbi/7cd084941338484aae1ad9425b84077c.png",
                    "sub_url": "https://i0.hdslb.com/bfs/wbi/4932caff0ff746eab6f01bf08b70ac45.png"
                }
            }
        }))
        .unwrap();

        let nav = envelope.data.unwrap();
        let keys = WbiKeys::from_urls(&nav.wbi_img.img_url, &nav.wbi_img.sub_url).unwrap();
        assert_eq!(keys.img_key, "7cd084941338484aae1ad9425b84077c");
        assert_eq!(keys.sub_key, "4932caff0ff746eab6f01bf08b70ac45");
    }
}
