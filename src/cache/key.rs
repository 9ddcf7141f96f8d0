//! 缓存键派生
//!
//! 缓存键是 `(operation, service, source_lang, target_lang, text)` 的纯函数，
//! 不依赖进程状态，因此持久层中的条目可以跨进程重启命中。
//!
//! 默认使用 32 位滚动哈希。缓存不保存原文做二次校验，哈希碰撞会表现为
//! 偶发的错误命中或覆盖；需要更强保证时可切换为 [`KeyAlgorithm::Blake3`]。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// 字段分隔符（U+001F 单元分隔符），正常文本中不会出现
const FIELD_SEPARATOR: char = '\u{1f}';

/// 请求类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Translate,
    Polish,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Translate => "translate",
            Operation::Polish => "polish",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "translate" => Ok(Operation::Translate),
            "polish" => Ok(Operation::Polish),
            other => Err(RelayError::InvalidInput(format!(
                "未知的操作类型 '{}'，可选: translate, polish",
                other
            ))),
        }
    }
}

/// 键哈希算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    /// 32 位滚动哈希（`h * 31 + c`，按 UTF-16 码元）
    #[default]
    Rolling32,
    /// BLAKE3，256 位
    Blake3,
}

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        CacheKey(value)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey(value.to_string())
    }
}

/// 使用默认算法派生缓存键
pub fn derive_key(
    operation: Operation,
    service: &str,
    source_lang: &str,
    target_lang: &str,
    text: &str,
) -> CacheKey {
    derive_key_with(
        KeyAlgorithm::Rolling32,
        operation,
        service,
        source_lang,
        target_lang,
        text,
    )
}

/// 使用指定算法派生缓存键
pub fn derive_key_with(
    algorithm: KeyAlgorithm,
    operation: Operation,
    service: &str,
    source_lang: &str,
    target_lang: &str,
    text: &str,
) -> CacheKey {
    let material = join_fields(&[operation.as_str(), service, source_lang, target_lang, text]);

    let digest = match algorithm {
        KeyAlgorithm::Rolling32 => format!("{:08x}", rolling_hash32(&material)),
        KeyAlgorithm::Blake3 => blake3::hash(material.as_bytes()).to_hex().to_string(),
    };

    CacheKey(format!("{}:{}", operation.as_str(), digest))
}

fn join_fields(fields: &[&str]) -> String {
    let capacity = fields.iter().map(|f| f.len() + 1).sum();
    let mut material = String::with_capacity(capacity);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            material.push(FIELD_SEPARATOR);
        }
        material.push_str(field);
    }
    material
}

/// 32 位滚动哈希
pub fn rolling_hash32(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(u32::from(unit)))
}
