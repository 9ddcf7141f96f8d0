//! OpenAI 兼容接口
//!
//! OpenAI、DeepSeek、通义千问（DashScope 兼容模式）、豆包和火山引擎方舟
//! 都提供 `POST {base_url}/chat/completions`，只是地址、模型和密钥不同。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{build_client, missing_key_error, request_error, status_error, Provider};
use crate::config::ProviderConfig;
use crate::error::{RelayError, RelayResult};
use crate::extract::{extract_result, Extraction};

/// OpenAI 兼容服务商
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f32,
    extract_from_prose: bool,
    client: Client,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl OpenAiCompatibleProvider {
    pub fn from_config(
        name: &str,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> RelayResult<Self> {
        Ok(Self {
            name: name.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolve_api_key(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            extract_from_prose: config.extract_from_prose,
            client: build_client(timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// 构建请求体
    pub fn build_request_body(&self, system: &str, user: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": self.temperature,
            "stream": false
        })
    }

    /// 读取 `choices[0].message.content`
    pub fn extract_content(response: &Value) -> Option<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
    }

    /// 按需对模型输出做结果提取
    fn finish_output(&self, content: String) -> RelayResult<String> {
        if !self.extract_from_prose {
            return Ok(content.trim().to_string());
        }

        match extract_result(&content) {
            Extraction::Extracted(text) => Ok(text),
            Extraction::Failed => {
                warn!("{} 的输出中没有可提取的结果", self.name);
                metrics::counter!(
                    "transpolish_provider_failures_total",
                    "service" => self.name.clone()
                )
                .increment(1);
                Err(RelayError::ExtractionFailed(self.name.clone()))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> RelayResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_key_error(&self.name, &self.api_key_env))?;

        debug!("{} 请求模型 {}", self.name, self.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.build_request_body(system, user))
            .send()
            .await
            .map_err(|e| request_error(&self.name, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&self.name, status.as_u16(), &body));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| request_error(&self.name, e))?;

        let content = Self::extract_content(&json).ok_or_else(|| {
            RelayError::Provider(format!("{} 的响应中缺少 choices[0].message.content", self.name))
        })?;

        self.finish_output(content)
    }
}
