//! 服务商查找表

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::{GeminiProvider, OpenAiCompatibleProvider, Provider};
use crate::config::{AppConfig, ProviderKind};
use crate::error::RelayResult;

/// 服务名到服务商的映射，支持别名
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    aliases: HashMap<String, String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置创建全部服务商
    pub fn from_config(config: &AppConfig) -> RelayResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut registry = Self::new();

        for (name, provider_config) in &config.providers {
            let provider: Arc<dyn Provider> = match provider_config.kind {
                ProviderKind::OpenAi => Arc::new(OpenAiCompatibleProvider::from_config(
                    name,
                    provider_config,
                    timeout,
                )?),
                ProviderKind::Gemini => Arc::new(GeminiProvider::from_config(
                    name,
                    provider_config,
                    timeout,
                )?),
            };
            registry.register(provider);

            for alias in &provider_config.aliases {
                registry.alias(alias, name);
            }
        }

        info!("已注册 {} 个服务商: {:?}", registry.len(), registry.names());
        Ok(registry)
    }

    /// 注册服务商，同名时覆盖
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_ascii_lowercase();
        debug!("注册服务商 {} ({})", name, provider.model());
        self.providers.insert(name, provider);
    }

    /// 添加别名
    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases
            .insert(alias.to_ascii_lowercase(), target.to_ascii_lowercase());
    }

    /// 把服务名或别名解析为规范服务名
    pub fn canonical_name(&self, service: &str) -> Option<String> {
        let service = service.trim().to_ascii_lowercase();
        if self.providers.contains_key(&service) {
            return Some(service);
        }
        self.aliases
            .get(&service)
            .filter(|target| self.providers.contains_key(*target))
            .cloned()
    }

    /// 按服务名或别名查找
    pub fn get(&self, service: &str) -> Option<Arc<dyn Provider>> {
        let name = self.canonical_name(service)?;
        self.providers.get(&name).cloned()
    }

    /// 已注册的服务名（排序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
