//! 会话历史 API 处理器

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};

use crate::web::types::AppState;

/// 获取会话历史
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    let entries = state.history.get(&id);
    Json(json!({
        "conversationId": id,
        "count": entries.len(),
        "entries": entries,
    }))
}

/// 删除会话历史
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    let removed = state.history.clear(&id);
    Json(json!({
        "conversationId": id,
        "removed": removed,
    }))
}
