//! 应用配置
//!
//! 读取顺序：内置默认值 → TOML 配置文件（可选）→ 环境变量覆盖。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{KeyAlgorithm, ResponseCache};
use crate::error::{helpers::config_error, RelayResult};
use crate::gateway::GatewayResponse;

/// 默认配置文件名（不含扩展名）
pub const DEFAULT_CONFIG_NAME: &str = "transpolish";

/// 服务商接口类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI 兼容的 chat/completions 接口
    OpenAi,
    /// Google Gemini generateContent 接口
    Gemini,
}

/// 单个服务商配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    /// 读取 API 密钥的环境变量名
    pub api_key_env: String,
    /// 直接写在配置里的密钥，优先于环境变量，不会被打印
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// 模型输出需要经过 `extract_result` 提取
    #[serde(default)]
    pub extract_from_prose: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 额外的服务名别名
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_temperature() -> f32 {
    0.3
}

impl ProviderConfig {
    fn new(kind: ProviderKind, base_url: &str, model: &str, api_key_env: &str) -> Self {
        Self {
            kind,
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key_env: api_key_env.to_string(),
            api_key: None,
            extract_from_prose: false,
            temperature: default_temperature(),
            aliases: Vec::new(),
        }
    }

    /// 解析 API 密钥
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Web 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 7080,
            static_dir: Some("static".to_string()),
        }
    }
}

impl ServerConfig {
    /// 获取完整的监听地址
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// 缓存配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub capacity: usize,
    pub max_age_secs: u64,
    pub sweep_interval_secs: u64,
    /// 持久层文件，缺省时只使用内存层
    pub durable_path: Option<String>,
    pub key_algorithm: KeyAlgorithm,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
            max_age_secs: 24 * 60 * 60,
            sweep_interval_secs: 60 * 60,
            durable_path: Some("~/.transpolish/cache.redb".to_string()),
            key_algorithm: KeyAlgorithm::Rolling32,
        }
    }
}

impl CacheSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// 展开 `~` 和环境变量后的持久层路径
    pub fn resolved_durable_path(&self) -> Option<PathBuf> {
        let raw = self.durable_path.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match shellexpand::full(raw) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(e) => {
                tracing::warn!("无法展开缓存路径 '{}': {}", raw, e);
                Some(PathBuf::from(shellexpand::tilde(raw).as_ref()))
            }
        }
    }

    /// 按配置创建响应缓存，未启用时返回 `None`
    pub fn build_cache(&self) -> Option<ResponseCache> {
        if !self.enabled {
            tracing::info!("响应缓存已禁用");
            return None;
        }

        let mut builder = ResponseCache::<GatewayResponse>::builder()
            .capacity(self.capacity)
            .max_age(self.max_age())
            .key_algorithm(self.key_algorithm);

        if let Some(path) = self.resolved_durable_path() {
            builder = builder.durable_path(path);
        }

        Some(builder.build())
    }
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 请求未指定服务时使用
    pub default_service: String,
    pub request_timeout_secs: u64,
    /// 每个会话保留的历史条数
    pub history_limit: usize,
    pub server: ServerConfig,
    pub cache: CacheSettings,
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_service: "openai".to_string(),
            request_timeout_secs: 60,
            history_limit: 200,
            server: ServerConfig::default(),
            cache: CacheSettings::default(),
            providers: default_providers(),
        }
    }
}

/// 内置的服务商表
pub fn default_providers() -> BTreeMap<String, ProviderConfig> {
    let mut providers = BTreeMap::new();

    let mut openai = ProviderConfig::new(
        ProviderKind::OpenAi,
        "https://api.openai.com/v1",
        "gpt-4o-mini",
        "OPENAI_API_KEY",
    );
    openai.aliases = vec!["gpt".to_string()];
    providers.insert("openai".to_string(), openai);

    providers.insert(
        "gemini".to_string(),
        ProviderConfig::new(
            ProviderKind::Gemini,
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-1.5-flash",
            "GEMINI_API_KEY",
        ),
    );

    let mut deepseek = ProviderConfig::new(
        ProviderKind::OpenAi,
        "https://api.deepseek.com/v1",
        "deepseek-chat",
        "DEEPSEEK_API_KEY",
    );
    deepseek.extract_from_prose = true;
    providers.insert("deepseek".to_string(), deepseek);

    providers.insert(
        "qwen".to_string(),
        ProviderConfig::new(
            ProviderKind::OpenAi,
            "https://dashscope.aliyuncs.com/compatible-mode/v1",
            "qwen-turbo",
            "DASHSCOPE_API_KEY",
        ),
    );

    providers.insert(
        "doubao".to_string(),
        ProviderConfig::new(
            ProviderKind::OpenAi,
            "https://ark.cn-beijing.volces.com/api/v3",
            "doubao-pro-32k",
            "ARK_API_KEY",
        ),
    );

    let mut volcengine = ProviderConfig::new(
        ProviderKind::OpenAi,
        "https://ark.cn-beijing.volces.com/api/v3",
        "deepseek-v3-241226",
        "VOLCENGINE_API_KEY",
    );
    volcengine.extract_from_prose = true;
    providers.insert("volcengine".to_string(), volcengine);

    providers
}

impl AppConfig {
    /// 加载配置
    ///
    /// 指定路径时文件必须存在；否则尝试读取工作目录下的 `transpolish.toml`。
    pub fn load(path: Option<&Path>) -> RelayResult<Self> {
        let source = match path {
            Some(path) => config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME)
                .format(config::FileFormat::Toml)
                .required(false),
        };

        let settings = config::Config::builder().add_source(source).build()?;
        let mut config: AppConfig = settings.try_deserialize()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 字符串解析（不应用环境变量）
    pub fn from_toml_str(content: &str) -> RelayResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cache, gateway, web, EnvVar};

        if let Some(enabled) = cache::Enabled::get_if_set() {
            self.cache.enabled = enabled;
        }
        if let Some(capacity) = cache::Capacity::get_if_set() {
            self.cache.capacity = capacity;
        }
        if let Some(max_age) = cache::MaxAge::get_if_set() {
            self.cache.max_age_secs = max_age.as_secs();
        }
        if let Some(interval) = cache::SweepInterval::get_if_set() {
            self.cache.sweep_interval_secs = interval.as_secs();
        }
        if let Some(path) = cache::DurablePath::get_if_set() {
            self.cache.durable_path = if path.is_empty() { None } else { Some(path) };
        }

        if let Some(service) = gateway::DefaultService::get_if_set() {
            self.default_service = service;
        }
        if let Some(timeout) = gateway::RequestTimeout::get_if_set() {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(bind_addr) = web::BindAddress::get_if_set() {
            self.server.bind_addr = bind_addr;
        }
        if let Some(port) = web::Port::get_if_set() {
            self.server.port = port;
        }
        if let Some(static_dir) = web::StaticDir::get_if_set() {
            self.server.static_dir = if static_dir.is_empty() { None } else { Some(static_dir) };
        }
    }

    /// 验证配置
    pub fn validate(&self) -> RelayResult<()> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(config_error("绑定地址不能为空"));
        }

        if self.server.port == 0 {
            return Err(config_error("端口不能为0"));
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(config_error("启用缓存时缓存容量不能为0"));
        }

        if self.cache.max_age_secs == 0 {
            return Err(config_error("缓存最大存活时间必须大于0"));
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(config_error("缓存清理间隔必须大于0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(config_error("请求超时必须大于0"));
        }

        if self.providers.is_empty() {
            return Err(config_error("至少需要配置一个服务商"));
        }

        for (name, provider) in &self.providers {
            let url = Url::parse(&provider.base_url)
                .map_err(|e| config_error(format!("服务商 '{}' 的 base_url 无效: {}", name, e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(config_error(format!(
                    "服务商 '{}' 的 base_url 必须使用 http 或 https",
                    name
                )));
            }
            if provider.model.trim().is_empty() {
                return Err(config_error(format!("服务商 '{}' 未指定模型", name)));
            }
        }

        if !self.knows_service(&self.default_service) {
            return Err(config_error(format!(
                "默认服务 '{}' 未在 providers 中配置",
                self.default_service
            )));
        }

        Ok(())
    }

    /// 服务名（或别名）是否已配置，不区分大小写
    pub fn knows_service(&self, service: &str) -> bool {
        let service = service.trim();
        self.providers.iter().any(|(name, provider)| {
            name.eq_ignore_ascii_case(service)
                || provider
                    .aliases
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(service))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 序列化为 TOML（不包含密钥）
    pub fn to_toml_string(&self) -> RelayResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
