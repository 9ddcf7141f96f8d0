//! 翻译与润色 API 处理器

use std::sync::Arc;

use axum::{
    extract::{Json as ExtractJson, State},
    response::Json,
};

use crate::cache::Operation;
use crate::gateway::GatewayOutcome;
use crate::history::HistoryEntry;
use crate::web::handlers::{api_error, ApiError};
use crate::web::types::{ApiPolishRequest, ApiResultResponse, ApiTranslateRequest, AppState};

/// 翻译文本
pub async fn translate(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<ApiTranslateRequest>,
) -> Result<Json<ApiResultResponse>, ApiError> {
    tracing::debug!(
        "收到翻译请求: service={:?}, {} 字符",
        request.request.service,
        request.request.text.chars().count()
    );

    let outcome = state
        .gateway
        .translate(request.request)
        .await
        .map_err(api_error)?;

    remember(&state, request.conversation_id.as_deref(), Operation::Translate, &outcome);
    Ok(Json(outcome.into()))
}

/// 润色文本
pub async fn polish(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<ApiPolishRequest>,
) -> Result<Json<ApiResultResponse>, ApiError> {
    tracing::debug!(
        "收到润色请求: service={:?}, style={:?}",
        request.request.service,
        request.request.style
    );

    let outcome = state
        .gateway
        .polish(request.request)
        .await
        .map_err(api_error)?;

    remember(&state, request.conversation_id.as_deref(), Operation::Polish, &outcome);
    Ok(Json(outcome.into()))
}

fn remember(
    state: &AppState,
    conversation_id: Option<&str>,
    operation: Operation,
    outcome: &GatewayOutcome,
) {
    if let Some(id) = conversation_id.filter(|id| !id.trim().is_empty()) {
        state
            .history
            .record(id, HistoryEntry::from_outcome(operation, outcome));
    }
}
