//! 大模型服务商
//!
//! 所有服务商实现同一个 [`Provider`] trait，按服务名从 [`ProviderRegistry`] 中查找。
//! 翻译和润色只是不同的提示词，具体实现只需要提供 `complete`。

pub mod gemini;
pub mod openai;
pub mod prompts;
pub mod registry;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatibleProvider;
pub use registry::ProviderRegistry;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{RelayError, RelayResult};

/// 服务商能力
#[async_trait]
pub trait Provider: Send + Sync {
    /// 服务名，例如 `deepseek`
    fn name(&self) -> &str;

    /// 使用的模型
    fn model(&self) -> &str;

    /// 发送一轮对话并返回模型输出文本
    async fn complete(&self, system: &str, user: &str) -> RelayResult<String>;

    /// 翻译文本
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> RelayResult<String> {
        let system = prompts::translation_system_prompt(source_lang, target_lang);
        self.complete(&system, text).await
    }

    /// 润色文本
    async fn polish(&self, text: &str, style: &str) -> RelayResult<String> {
        let system = prompts::polish_system_prompt(style);
        self.complete(&system, text).await
    }
}

/// 创建带超时的 HTTP 客户端
pub(crate) fn build_client(timeout: Duration) -> RelayResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RelayError::Config(format!("无法创建 HTTP 客户端: {}", e)))
}

/// 把非成功状态码转换为错误
pub(crate) fn status_error(service: &str, status: u16, body: &str) -> RelayError {
    metrics::counter!("transpolish_provider_failures_total", "service" => service.to_string())
        .increment(1);

    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["message"].as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        408 | 504 => RelayError::Timeout(format!("{} ({}): {}", service, status, message)),
        _ => RelayError::Provider(format!("{} ({}): {}", service, status, message)),
    }
}

/// 请求失败时计数并转换错误
pub(crate) fn request_error(service: &str, error: reqwest::Error) -> RelayError {
    metrics::counter!("transpolish_provider_failures_total", "service" => service.to_string())
        .increment(1);
    RelayError::from(error).with_context(service)
}

/// 未配置密钥
pub(crate) fn missing_key_error(service: &str, env_name: &str) -> RelayError {
    RelayError::Config(format!(
        "服务 '{}' 未配置 API 密钥（请设置环境变量 {}）",
        service, env_name
    ))
}
