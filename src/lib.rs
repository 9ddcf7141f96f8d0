//! # Transpolish
//!
//! 翻译与文本润色后端：把请求分发到多个大模型服务商，并用两级响应缓存
//! （有界内存层 + redb 持久层）避免重复调用。
//!
//! ## 模块组织
//!
//! - `cache` - 两级响应缓存（键派生、内存层、持久层、过期清理）
//! - `providers` - 服务商抽象与实现（OpenAI 兼容接口、Gemini）
//! - `extract` - 从模型自由文本输出中提取结果
//! - `gateway` - 带缓存的翻译/润色网关
//! - `history` - 会话历史
//! - `config` - 配置文件
//! - `env` - 环境变量
//! - `error` - 错误类型
//! - `web` - Web服务器功能（可选）

pub mod cache;
pub mod config;
pub mod env;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod history;
pub mod providers;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used items for convenience
pub use cache::{CacheKey, Operation, ResponseCache};
pub use config::AppConfig;
pub use error::{RelayError, RelayResult};
pub use extract::{extract_result, Extraction};
pub use gateway::{Gateway, GatewayOutcome, GatewayResponse, PolishRequest, TranslateRequest};
pub use history::{HistoryEntry, HistoryStore};
pub use providers::{Provider, ProviderRegistry};
