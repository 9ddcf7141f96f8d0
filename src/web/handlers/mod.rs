//! Web 路由处理器

pub mod api;

pub use api::*;

use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::error::{helpers::log_error, ErrorCategory, RelayError};

/// 处理器错误响应
pub type ApiError = (StatusCode, Json<Value>);

/// 错误对应的 HTTP 状态码
pub fn status_for(error: &RelayError) -> StatusCode {
    match error {
        RelayError::InvalidInput(_) | RelayError::UnknownService(_) => StatusCode::BAD_REQUEST,
        RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => match error.category() {
            ErrorCategory::Network | ErrorCategory::Service | ErrorCategory::Parsing => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

/// 把错误转换为 JSON 响应
pub fn api_error(error: RelayError) -> ApiError {
    log_error(&error);
    (
        status_for(&error),
        Json(json!({
            "error": true,
            "category": format!("{:?}", error.category()),
            "message": error.to_string(),
        })),
    )
}
