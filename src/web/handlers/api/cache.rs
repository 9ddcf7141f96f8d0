//! 缓存相关API处理器

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::web::types::AppState;

/// 获取缓存统计信息
pub async fn get_cache_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.gateway.cache() {
        Some(cache) => {
            let stats = cache.stats().await;
            Json(json!({
                "enabled": true,
                "hitRate": stats.hit_rate(),
                "stats": stats,
            }))
        }
        None => Json(json!({
            "enabled": false,
            "hitRate": 0.0,
            "stats": null,
        })),
    }
}

/// 清空两级缓存
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let Some(cache) = state.gateway.cache() else {
        return Json(json!({ "success": false, "message": "缓存未启用" }));
    };

    let before = cache.stats().await;
    cache.clear_all().await;
    tracing::info!("已清空响应缓存");

    Json(json!({
        "success": true,
        "message": "缓存已清空",
        "memoryCleared": before.memory_count,
        "durableCleared": before.durable_count,
    }))
}

/// 立即清理过期条目
pub async fn cleanup_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let Some(cache) = state.gateway.cache() else {
        return Json(json!({ "success": false, "message": "缓存未启用" }));
    };

    match cache.sweep_expired().await {
        Some(report) => Json(json!({
            "success": true,
            "skipped": false,
            "memoryRemoved": report.memory_removed,
            "durableRemoved": report.durable_removed,
        })),
        None => Json(json!({
            "success": true,
            "skipped": true,
            "message": "已有清理任务在运行",
        })),
    }
}
