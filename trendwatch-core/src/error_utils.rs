use crate::error::*;
use tracing::{error, warn};

/// Logging, classification and presentation helpers shared by the error types.
pub trait ErrorExt: std::fmt::Display {
    fn log_error(&self) -> &Self {
        error!("{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("{}", self);
        self
    }

    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("{}", self);
        match self {
            CoreError::BilibiliApi(e) => {
                error!("Bilibili API error details: {:?}", e);
            }
            CoreError::Storage(e) => {
                error!("Storage error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::BilibiliApi(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::BilibiliApi(e) => e.user_friendly_message(),
            CoreError::Storage(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::Cancelled { operation } => format!("{} was cancelled.", operation),
            CoreError::Busy { .. } => {
                "A refresh is already running. Please wait for it to finish.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::BilibiliApi(_) => "BILIBILI_API".to_string(),
            CoreError::Storage(_) => "STORAGE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::Cancelled { .. } => "CANCELLED".to_string(),
            CoreError::Busy { .. } => "BUSY".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for BilibiliApiError {
    fn is_retryable(&self) -> bool {
        match self {
            BilibiliApiError::SignatureRejected { .. } => true,
            BilibiliApiError::RequestTimeout => true,
            BilibiliApiError::ServerError { status_code } => *status_code >= 500,
            BilibiliApiError::KeyFetchFailed { .. } => true,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            BilibiliApiError::SignatureRejected { .. } => {
                "Bilibili rejected the request signature. Keys will be refreshed.".to_string()
            }
            BilibiliApiError::ApiError { message, .. } => {
                format!("Bilibili returned an error: {}", message)
            }
            BilibiliApiError::KeyFetchFailed { .. } => {
                "Could not obtain signing keys from Bilibili. Please try again.".to_string()
            }
            BilibiliApiError::RequestTimeout => {
                "Request to Bilibili timed out. Please try again.".to_string()
            }
            _ => "Bilibili API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            BilibiliApiError::SignatureRejected { .. } => "BILIBILI_SIGNATURE_REJECTED".to_string(),
            BilibiliApiError::ApiError { .. } => "BILIBILI_API_ERROR".to_string(),
            BilibiliApiError::KeyFetchFailed { .. } => "BILIBILI_KEY_FETCH_FAILED".to_string(),
            BilibiliApiError::RequestTimeout => "BILIBILI_TIMEOUT".to_string(),
            BilibiliApiError::InvalidResponse { .. } => "BILIBILI_INVALID_RESPONSE".to_string(),
            BilibiliApiError::ServerError { .. } => "BILIBILI_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for StorageError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StorageError::ReadFailed { path, .. } => format!("Could not read {}.", path),
            StorageError::WriteFailed { path, .. } => format!("Could not save {}.", path),
            StorageError::InvalidDateKey { date } => {
                format!("'{}' is not a valid date (expected YYYY-MM-DD).", date)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            StorageError::ReadFailed { .. } => "STORAGE_READ_FAILED".to_string(),
            StorageError::WriteFailed { .. } => "STORAGE_WRITE_FAILED".to_string(),
            StorageError::InvalidDateKey { .. } => "STORAGE_INVALID_DATE".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file not found: {}", path)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for setting '{}'.", value, field)
            }
            ConfigError::Parse(_) => {
                "Could not parse the settings file. Please check the TOML syntax.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}
