//! 服务列表与健康检查

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::web::types::{AppState, ServiceInfo, ServicesResponse};

/// 列出可用服务
pub async fn list_services(State(state): State<Arc<AppState>>) -> Json<ServicesResponse> {
    let registry = state.gateway.registry();
    let services = registry
        .names()
        .into_iter()
        .filter_map(|name| {
            registry.get(&name).map(|provider| ServiceInfo {
                model: provider.model().to_string(),
                name,
            })
        })
        .collect();

    Json(ServicesResponse {
        default_service: state.gateway.default_service().to_string(),
        services,
    })
}

/// 健康检查
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cacheEnabled": state.gateway.cache().is_some(),
        "durableCache": state
            .gateway
            .cache()
            .map(|cache| cache.has_durable_tier())
            .unwrap_or(false),
    }))
}
