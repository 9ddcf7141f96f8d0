//! Web 模块的数据类型定义

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::gateway::{Gateway, GatewayOutcome, GatewayResponse, PolishRequest, TranslateRequest};
use crate::history::HistoryStore;
use crate::providers::ProviderRegistry;
use crate::error::RelayResult;

/// 应用状态
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<Gateway>,
    pub history: Arc<HistoryStore>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, gateway: Arc<Gateway>, history: Arc<HistoryStore>) -> Self {
        Self {
            config,
            gateway,
            history,
        }
    }

    /// 按配置组装网关、缓存和历史存储
    pub fn from_config(config: Arc<AppConfig>) -> RelayResult<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(&config)?);
        let cache = config.cache.build_cache().map(Arc::new);
        let gateway = Arc::new(Gateway::new(
            registry,
            cache,
            config.default_service.clone(),
            config.request_timeout(),
        ));
        let history = Arc::new(HistoryStore::new(config.history_limit));

        Ok(Self::new(config, gateway, history))
    }
}

/// 翻译接口请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTranslateRequest {
    #[serde(flatten)]
    pub request: TranslateRequest,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// 润色接口请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPolishRequest {
    #[serde(flatten)]
    pub request: PolishRequest,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// 翻译/润色接口响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResultResponse {
    #[serde(flatten)]
    pub response: GatewayResponse,
    pub cached: bool,
}

impl From<GatewayOutcome> for ApiResultResponse {
    fn from(outcome: GatewayOutcome) -> Self {
        Self {
            response: outcome.response,
            cached: outcome.cached,
        }
    }
}

/// 服务信息
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub model: String,
}

/// 服务列表响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesResponse {
    pub default_service: String,
    pub services: Vec<ServiceInfo>,
}
