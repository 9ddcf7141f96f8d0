//! 错误处理集成测试

use transpolish::error::{ErrorCategory, ErrorSeverity, RelayError};
use transpolish::AppConfig;

#[test]
fn test_cache_errors_are_warnings() {
    for error in [
        RelayError::DurableUnavailable("quota".to_string()),
        RelayError::KeyDerivation("hash".to_string()),
    ] {
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.category(), ErrorCategory::Cache);
    }
}

#[test]
fn test_retryable_classification() {
    assert!(RelayError::Timeout("slow".to_string()).is_retryable());
    assert!(RelayError::Network("reset".to_string()).is_retryable());
    assert!(!RelayError::InvalidInput("empty".to_string()).is_retryable());
    assert!(!RelayError::UnknownService("x".to_string()).is_retryable());
}

#[test]
fn test_context_keeps_variant() {
    let error = RelayError::Provider("500".to_string()).with_context("deepseek");
    assert!(matches!(error, RelayError::Provider(_)));
    assert!(error.to_string().contains("deepseek"));
}

#[test]
fn test_json_error_conversion() {
    let error: RelayError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert_eq!(error.category(), ErrorCategory::Serialization);
}

#[test]
fn test_invalid_config_file_is_reported() {
    let result = AppConfig::from_toml_str("request_timeout_secs = \"soon\"");
    assert!(matches!(result, Err(RelayError::Config(_))));

    let result = AppConfig::from_toml_str("default_service = \"nowhere\"");
    assert!(matches!(result, Err(RelayError::Config(ref m)) if m.contains("nowhere")));
}

#[test]
fn test_missing_explicit_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(AppConfig::load(Some(missing.as_path())).is_err());
}

#[cfg(feature = "web")]
#[test]
fn test_http_status_mapping() {
    use axum::http::StatusCode;
    use transpolish::web::handlers::status_for;

    let cases = [
        (RelayError::InvalidInput(String::new()), StatusCode::BAD_REQUEST),
        (RelayError::UnknownService(String::new()), StatusCode::BAD_REQUEST),
        (RelayError::Provider(String::new()), StatusCode::BAD_GATEWAY),
        (RelayError::Network(String::new()), StatusCode::BAD_GATEWAY),
        (RelayError::ExtractionFailed(String::new()), StatusCode::BAD_GATEWAY),
        (RelayError::Timeout(String::new()), StatusCode::GATEWAY_TIMEOUT),
        (RelayError::Config(String::new()), StatusCode::INTERNAL_SERVER_ERROR),
        (RelayError::Internal(String::new()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        assert_eq!(status_for(&error), expected, "{:?}", error);
    }
}
