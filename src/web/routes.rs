//! Web 路由定义

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::web::{handlers::*, types::AppState};

/// 创建路由结构
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        // 翻译与润色
        .route("/api/translate", post(translate))
        .route("/api/polish", post(polish))
        .route("/api/services", get(list_services))
        // 缓存管理
        .route("/api/cache/stats", get(get_cache_stats))
        .route("/api/cache/clear", post(clear_cache))
        .route("/api/cache/cleanup", post(cleanup_cache))
        // 会话历史
        .route("/api/history/:id", get(get_history).delete(delete_history))
}
