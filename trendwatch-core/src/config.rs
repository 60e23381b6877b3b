use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Search terms used when no keyword configuration has been saved yet.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "秋招", "秋招面经", "校招", "校招面经", "面试", "面试经验", "面试题",
    "简历", "求职", "找工作", "实习转正", "校园招聘", "互联网大厂",
    "应届生", "毕业生", "招聘", "内推", "笔试", "技术面试", "hr面",
    "薪资", "offer", "面试准备", "面试技巧", "面试流程", "面试心得",
    "Java面试", "前端面试", "后端面试", "算法面试", "产品经理面试",
    "运营面试", "设计面试", "测试面试", "运维面试", "数据分析面试",
    "2025秋招", "2026校招", "秋招时间线", "秋招日程", "大厂秋招",
    "字节跳动", "腾讯", "阿里巴巴", "百度", "美团", "京东", "华为",
    "小米", "网易", "拼多多", "滴滴", "快手", "B站", "小红书",
];

pub fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// The user-editable keyword list. Order is search order; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
        }
    }
}

impl KeywordConfig {
    pub fn new(keywords: Vec<String>) -> Self {
        Self { keywords }
    }

    /// Keywords to search this cycle. Blank entries are dropped; an empty
    /// result falls back to [`DEFAULT_KEYWORDS`].
    pub fn effective_keywords(&self) -> Vec<String> {
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        if keywords.is_empty() {
            default_keywords()
        } else {
            keywords
        }
    }
}

/// Longest accepted ranking window: one year.
pub const MAX_WINDOW_HOURS: i64 = 24 * 365;

/// Longest accepted polling interval: one week.
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Runtime settings, read from a TOML file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub pacing_secs: u64,
    pub key_ttl_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub page_size: u32,
    pub rank_limit: usize,
    pub window_hours: i64,
    pub poll_interval_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            request_timeout_secs: 30,
            pacing_secs: 2,
            key_ttl_secs: 3600,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            page_size: 20,
            rank_limit: 50,
            window_hours: 24,
            poll_interval_minutes: 60,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", self.max_attempts));
        }
        if self.page_size == 0 {
            return Err(invalid("page_size", self.page_size));
        }
        if self.rank_limit == 0 {
            return Err(invalid("rank_limit", self.rank_limit));
        }
        if self.window_hours <= 0 || self.window_hours > MAX_WINDOW_HOURS {
            return Err(invalid("window_hours", self.window_hours));
        }
        if !(1..=MAX_POLL_INTERVAL_MINUTES).contains(&self.poll_interval_minutes) {
            return Err(invalid("poll_interval_minutes", self.poll_interval_minutes));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", self.request_timeout_secs));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    pub fn key_ttl(&self) -> Duration {
        Duration::from_secs(self.key_ttl_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_hours.min(MAX_WINDOW_HOURS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }
}

fn invalid(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keyword_list() {
        assert_eq!(DEFAULT_KEYWORDS.len(), 55);
        assert_eq!(KeywordConfig::default().keywords.len(), 55);
        assert!(DEFAULT_KEYWORDS.contains(&"offer"));
    }

    #[test]
    fn test_effective_keywords_falls_back_when_empty() {
        let empty = KeywordConfig::new(vec![]);
        assert_eq!(empty.effective_keywords(), default_keywords());

        let blank = KeywordConfig::new(vec!["  ".to_string(), String::new()]);
        assert_eq!(blank.effective_keywords(), default_keywords());
    }

    #[test]
    fn test_effective_keywords_keeps_order_and_duplicates() {
        let config = KeywordConfig::new(vec![
            "offer".to_string(),
            " 面试 ".to_string(),
            "offer".to_string(),
        ]);
        assert_eq!(config.effective_keywords(), vec!["offer", "面试", "offer"]);
    }

    #[test]
    fn test_keyword_config_missing_field() {
        let config: KeywordConfig = serde_json::from_str("{}").unwrap();
        assert!(config.keywords.is_empty());
        assert_eq!(config.effective_keywords().len(), 55);
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::from_toml_str("pacing_secs = 5\nrank_limit = 10\n").unwrap();
        assert_eq!(settings.pacing(), Duration::from_secs(5));
        assert_eq!(settings.rank_limit, 10);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.key_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.window(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_settings_validation() {
        let result = Settings::from_toml_str("max_attempts = 0");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "max_attempts"
        ));

        let result = Settings::from_toml_str("page_size = \"twenty\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_settings_file() {
        let result = Settings::load(Path::new("/nonexistent/trendwatch.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_settings_upper_bounds() {
        let result = Settings::from_toml_str("window_hours = 9223372036854775807");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "window_hours"
        ));

        let result = Settings::from_toml_str("poll_interval_minutes = 18446744073709551615");
        assert!(result.is_err());

        let result = Settings::from_toml_str("poll_interval_minutes = 0");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "poll_interval_minutes"
        ));

        let at_limit = Settings::from_toml_str("window_hours = 8760
poll_interval_minutes = 10080");
        assert!(at_limit.is_ok());
    }

    #[test]
    fn test_unvalidated_extremes_do_not_panic() {
        let settings = Settings {
            window_hours: i64::MAX,
            poll_interval_minutes: u64::MAX,
            ..Default::default()
        };
        assert_eq!(settings.window(), chrono::Duration::hours(MAX_WINDOW_HOURS));
        assert_eq!(settings.poll_interval(), Duration::from_secs(u64::MAX));
    }
}
