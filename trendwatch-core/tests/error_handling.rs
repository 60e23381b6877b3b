use trendwatch_core::{BilibiliApiError, ConfigError, CoreError, ErrorExt, StorageError};

#[test]
fn test_error_codes() {
    let api_error = CoreError::BilibiliApi(BilibiliApiError::SignatureRejected { code: -412 });
    assert_eq!(api_error.error_code(), "BILIBILI_API");

    let storage_error = CoreError::Storage(StorageError::WriteFailed {
        path: "data/job_trend_data/2024-09-01.json".to_string(),
        reason: "disk full".to_string(),
    });
    assert_eq!(storage_error.error_code(), "STORAGE");

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "page_size".to_string(),
        value: "0".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let busy = CoreError::Busy {
        message: "cycle already in progress".to_string(),
    };
    assert_eq!(busy.error_code(), "BUSY");

    assert_eq!(
        BilibiliApiError::SignatureRejected { code: -412 }.error_code(),
        "BILIBILI_SIGNATURE_REJECTED"
    );
}

#[test]
fn test_retryable_errors() {
    let signature = CoreError::BilibiliApi(BilibiliApiError::SignatureRejected { code: -412 });
    assert!(signature.is_retryable());

    let timeout = CoreError::BilibiliApi(BilibiliApiError::RequestTimeout);
    assert!(timeout.is_retryable());

    let bad_gateway = CoreError::BilibiliApi(BilibiliApiError::ServerError { status_code: 502 });
    assert!(bad_gateway.is_retryable());

    let degraded = CoreError::BilibiliApi(BilibiliApiError::ApiError {
        code: -400,
        message: "请求错误".to_string(),
    });
    assert!(!degraded.is_retryable());

    let client_error = CoreError::BilibiliApi(BilibiliApiError::ServerError { status_code: 404 });
    assert!(!client_error.is_retryable());

    let write = CoreError::Storage(StorageError::WriteFailed {
        path: "config.json".to_string(),
        reason: "read-only file system".to_string(),
    });
    assert!(!write.is_retryable());
}

#[test]
fn test_user_friendly_messages() {
    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "rank_limit".to_string(),
        value: "0".to_string(),
    });
    assert!(config_error.user_friendly_message().contains("rank_limit"));

    let storage_error = CoreError::Storage(StorageError::InvalidDateKey {
        date: "yesterday".to_string(),
    });
    assert!(storage_error.user_friendly_message().contains("YYYY-MM-DD"));

    let cancelled = CoreError::Cancelled {
        operation: "cycle".to_string(),
    };
    assert_eq!(cancelled.user_friendly_message(), "cycle was cancelled.");
    assert_eq!(cancelled.to_string(), "Operation cancelled: cycle");
}

#[test]
fn test_log_helpers_return_self() {
    let error = CoreError::BilibiliApi(BilibiliApiError::RequestTimeout);
    assert_eq!(error.log_error().log_warn().error_code(), "BILIBILI_API");
}
