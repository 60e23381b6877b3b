use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Bilibili API error: {0}")]
    BilibiliApi(#[from] BilibiliApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Busy: {message}")]
    Busy { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum BilibiliApiError {
    /// Remote code -412: the WBI signature was refused.
    #[error("Signature rejected by search endpoint (code {code})")]
    SignatureRejected { code: i64 },

    #[error("API returned code {code}: {message}")]
    ApiError { code: i64, message: String },

    #[error("Failed to fetch WBI keys: {reason}")]
    KeyFetchFailed { reason: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Invalid date key: {date}")]
    InvalidDateKey { date: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
