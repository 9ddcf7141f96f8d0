//! 翻译/润色网关
//!
//! 先查响应缓存，未命中时调用服务商，并把成功结果写回缓存。
//! 服务商返回的错误不会被缓存。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{Operation, ResponseCache};
use crate::error::{helpers::validation_error, RelayError, RelayResult};
use crate::providers::{prompts::AUTO_DETECT, Provider, ProviderRegistry};

/// 未指定目标语言时使用
pub const DEFAULT_TARGET_LANG: &str = "zh";

/// 未指定润色风格时使用
pub const DEFAULT_STYLE: &str = "general";

/// 网关响应，也是缓存中保存的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub original_text: String,
    pub translated_text: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 翻译请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

/// 润色请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolishRequest {
    pub text: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

/// 网关处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOutcome {
    pub response: GatewayResponse,
    /// 结果来自缓存
    pub cached: bool,
}

/// 一次调用的规范化参数
struct Dispatch {
    operation: Operation,
    service: String,
    provider: Arc<dyn Provider>,
    /// 润色时为空
    source_lang: String,
    /// 润色时为风格
    target_lang: String,
    text: String,
}

/// 翻译/润色网关
pub struct Gateway {
    registry: Arc<ProviderRegistry>,
    cache: Option<Arc<ResponseCache>>,
    default_service: String,
    timeout: Duration,
}

impl Gateway {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: Option<Arc<ResponseCache>>,
        default_service: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            default_service: default_service.into(),
            timeout,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    pub fn default_service(&self) -> &str {
        &self.default_service
    }

    /// 翻译
    pub async fn translate(&self, request: TranslateRequest) -> RelayResult<GatewayOutcome> {
        let source_lang = non_blank(request.source_lang).unwrap_or_else(|| AUTO_DETECT.to_string());
        let target_lang =
            non_blank(request.target_lang).unwrap_or_else(|| DEFAULT_TARGET_LANG.to_string());

        let dispatch = self.prepare(
            Operation::Translate,
            request.service,
            source_lang,
            target_lang,
            request.text,
        )?;
        self.run(dispatch).await
    }

    /// 润色
    pub async fn polish(&self, request: PolishRequest) -> RelayResult<GatewayOutcome> {
        let style = non_blank(request.style).unwrap_or_else(|| DEFAULT_STYLE.to_string());

        let dispatch = self.prepare(
            Operation::Polish,
            request.service,
            String::new(),
            style,
            request.text,
        )?;
        self.run(dispatch).await
    }

    fn prepare(
        &self,
        operation: Operation,
        service: Option<String>,
        source_lang: String,
        target_lang: String,
        text: String,
    ) -> RelayResult<Dispatch> {
        if text.trim().is_empty() {
            return Err(validation_error("文本不能为空"));
        }

        let requested = non_blank(service).unwrap_or_else(|| self.default_service.clone());
        let service = self
            .registry
            .canonical_name(&requested)
            .ok_or_else(|| RelayError::UnknownService(requested.clone()))?;
        let provider = self
            .registry
            .get(&service)
            .ok_or_else(|| RelayError::UnknownService(requested))?;

        Ok(Dispatch {
            operation,
            service,
            provider,
            source_lang,
            target_lang,
            text,
        })
    }

    async fn run(&self, dispatch: Dispatch) -> RelayResult<GatewayOutcome> {
        let Dispatch {
            operation,
            service,
            provider,
            source_lang,
            target_lang,
            text,
        } = dispatch;

        if let Some(cache) = &self.cache {
            if let Some(response) = cache
                .lookup(operation, &service, &source_lang, &target_lang, &text)
                .await
            {
                debug!("{} 请求命中缓存 ({})", operation, service);
                return Ok(GatewayOutcome {
                    response,
                    cached: true,
                });
            }
        }

        let call = async {
            match operation {
                Operation::Translate => provider.translate(&text, &source_lang, &target_lang).await,
                Operation::Polish => provider.polish(&text, &target_lang).await,
            }
        };

        let translated_text = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                RelayError::Timeout(format!("{} 在 {} 秒内未响应", service, self.timeout.as_secs()))
            })??;

        info!(
            "{} 完成 ({}): {} 字符 -> {} 字符",
            operation,
            service,
            text.chars().count(),
            translated_text.chars().count()
        );

        let response = GatewayResponse {
            original_text: text.clone(),
            translated_text,
            service: service.clone(),
            error: None,
        };

        if let Some(cache) = &self.cache {
            cache
                .store(
                    operation,
                    &service,
                    &source_lang,
                    &target_lang,
                    &text,
                    response.clone(),
                )
                .await;
        }

        Ok(GatewayOutcome {
            response,
            cached: false,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
