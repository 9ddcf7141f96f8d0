//! Google Gemini 接口
//!
//! `POST {base_url}/models/{model}:generateContent?key=...`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{build_client, missing_key_error, request_error, status_error, Provider};
use crate::config::ProviderConfig;
use crate::error::{RelayError, RelayResult};
use crate::extract::{extract_result, Extraction};

pub struct GeminiProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f32,
    extract_from_prose: bool,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GeminiProvider {
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
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// 构建 generateContent 请求体
    pub fn build_request_body(&self, system: &str, user: &str) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": user }]
            }],
            "generationConfig": {
                "temperature": self.temperature
            }
        })
    }

    /// 拼接第一个候选中非思考部分的文本
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let text: String = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
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
            .query(&[("key", api_key)])
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

        let text = Self::extract_text(&json).ok_or_else(|| {
            let reason = json["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("响应中没有文本");
            RelayError::Provider(format!("{}: {}", self.name, reason))
        })?;

        if self.extract_from_prose {
            match extract_result(&text) {
                Extraction::Extracted(result) => Ok(result),
                Extraction::Failed => Err(RelayError::ExtractionFailed(self.name.clone())),
            }
        } else {
            Ok(text.trim().to_string())
        }
    }
}
