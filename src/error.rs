//! 统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。缓存层的内部错误（持久层不可用、
//! 键派生失败）只会被记录，不会传播给调用方。

use std::fmt;

use thiserror::Error;

/// 服务错误类型
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 未注册的服务商
    #[error("未知的服务: {0}")]
    UnknownService(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 服务商返回错误
    #[error("服务商错误: {0}")]
    Provider(String),

    /// 无法从模型输出中提取结果
    #[error("无法从模型输出中提取结果: {0}")]
    ExtractionFailed(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 持久缓存层不可用
    #[error("持久缓存不可用: {0}")]
    DurableUnavailable(String),

    /// 缓存键派生失败
    #[error("缓存键派生失败: {0}")]
    KeyDerivation(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl RelayError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Network(_) => true,
            RelayError::Timeout(_) => true,
            RelayError::Provider(_) => true,
            RelayError::DurableUnavailable(_) => true,
            RelayError::ExtractionFailed(_) => true,
            RelayError::Config(_) => false,
            RelayError::InvalidInput(_) => false,
            RelayError::UnknownService(_) => false,
            RelayError::Serialization(_) => false,
            RelayError::KeyDerivation(_) => false,
            RelayError::Internal(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RelayError::Config(_) => ErrorSeverity::Critical,
            RelayError::InvalidInput(_) => ErrorSeverity::Info,
            RelayError::UnknownService(_) => ErrorSeverity::Info,
            RelayError::Network(_) => ErrorSeverity::Warning,
            RelayError::Provider(_) => ErrorSeverity::Error,
            RelayError::ExtractionFailed(_) => ErrorSeverity::Warning,
            RelayError::Timeout(_) => ErrorSeverity::Warning,
            RelayError::Serialization(_) => ErrorSeverity::Error,
            RelayError::DurableUnavailable(_) => ErrorSeverity::Warning,
            RelayError::KeyDerivation(_) => ErrorSeverity::Warning,
            RelayError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::Config(_) => ErrorCategory::Configuration,
            RelayError::InvalidInput(_) => ErrorCategory::Input,
            RelayError::UnknownService(_) => ErrorCategory::Input,
            RelayError::Network(_) => ErrorCategory::Network,
            RelayError::Provider(_) => ErrorCategory::Service,
            RelayError::ExtractionFailed(_) => ErrorCategory::Parsing,
            RelayError::Timeout(_) => ErrorCategory::Timeout,
            RelayError::Serialization(_) => ErrorCategory::Serialization,
            RelayError::DurableUnavailable(_) => ErrorCategory::Cache,
            RelayError::KeyDerivation(_) => ErrorCategory::Cache,
            RelayError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = format!("{} (上下文: {})", self, context);

        match &mut self {
            RelayError::Config(msg)
            | RelayError::InvalidInput(msg)
            | RelayError::UnknownService(msg)
            | RelayError::Network(msg)
            | RelayError::Provider(msg)
            | RelayError::ExtractionFailed(msg)
            | RelayError::Timeout(msg)
            | RelayError::Serialization(msg)
            | RelayError::DurableUnavailable(msg)
            | RelayError::KeyDerivation(msg)
            | RelayError::Internal(msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Service,
    Parsing,
    Timeout,
    Serialization,
    Cache,
    Internal,
}

impl From<std::io::Error> for RelayError {
    fn from(error: std::io::Error) -> Self {
        RelayError::Internal(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(error: serde_json::Error) -> Self {
        RelayError::Serialization(format!("JSON序列化错误: {}", error))
    }
}

impl From<config::ConfigError> for RelayError {
    fn from(error: config::ConfigError) -> Self {
        RelayError::Config(error.to_string())
    }
}

impl From<toml::ser::Error> for RelayError {
    fn from(error: toml::ser::Error) -> Self {
        RelayError::Serialization(format!("TOML序列化错误: {}", error))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RelayError::Timeout(error.to_string())
        } else if error.is_decode() {
            RelayError::Serialization(error.to_string())
        } else if error.is_status() {
            RelayError::Provider(error.to_string())
        } else {
            RelayError::Network(error.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for RelayError {
    fn from(error: tokio::task::JoinError) -> Self {
        RelayError::Internal(format!("后台任务失败: {}", error))
    }
}

/// 错误结果类型别名
pub type RelayResult<T> = Result<T, RelayError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &RelayError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("请求信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("请求警告: {}", error),
            ErrorSeverity::Error => tracing::error!("请求错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("严重错误: {}", error),
        }
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> RelayError {
        RelayError::InvalidInput(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> RelayError {
        RelayError::Config(msg.to_string())
    }

    /// 创建持久缓存错误
    pub fn durable_error<T: fmt::Display>(msg: T) -> RelayError {
        RelayError::DurableUnavailable(msg.to_string())
    }
}
