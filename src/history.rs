//! 会话历史
//!
//! 按会话 ID 保存最近的翻译/润色记录，仅在内存中。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::cache::Operation;
use crate::gateway::GatewayOutcome;

/// 单条历史记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub operation: Operation,
    pub original_text: String,
    pub result_text: String,
    pub service: String,
    pub cached: bool,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_outcome(operation: Operation, outcome: &GatewayOutcome) -> Self {
        Self {
            operation,
            original_text: outcome.response.original_text.clone(),
            result_text: outcome.response.translated_text.clone(),
            service: outcome.response.service.clone(),
            cached: outcome.cached,
            created_at: Utc::now(),
        }
    }
}

/// 会话历史存储
#[derive(Debug)]
pub struct HistoryStore {
    conversations: DashMap<String, Vec<HistoryEntry>>,
    limit: usize,
}

impl HistoryStore {
    /// `limit` 为每个会话保留的条数，至少为 1
    pub fn new(limit: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            limit: limit.max(1),
        }
    }

    /// 追加记录，超出上限时丢弃最旧的
    pub fn record(&self, conversation_id: &str, entry: HistoryEntry) {
        let mut entries = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        entries.push(entry);
        if entries.len() > self.limit {
            let overflow = entries.len() - self.limit;
            entries.drain(..overflow);
        }
    }

    /// 获取会话记录（按时间顺序）
    pub fn get(&self, conversation_id: &str) -> Vec<HistoryEntry> {
        self.conversations
            .get(conversation_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// 删除会话，返回是否存在
    pub fn clear(&self, conversation_id: &str) -> bool {
        self.conversations.remove(conversation_id).is_some()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> HistoryEntry {
        HistoryEntry {
            operation: Operation::Translate,
            original_text: text.to_string(),
            result_text: format!("{}!", text),
            service: "openai".to_string(),
            cached: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_get() {
        let store = HistoryStore::new(10);
        store.record("c1", entry("a"));
        store.record("c1", entry("b"));
        store.record("c2", entry("c"));

        let c1 = store.get("c1");
        assert_eq!(c1.len(), 2);
        assert_eq!(c1[0].original_text, "a");
        assert_eq!(store.conversation_count(), 2);
        assert!(store.get("missing").is_empty());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let store = HistoryStore::new(2);
        for text in ["a", "b", "c"] {
            store.record("c1", entry(text));
        }
        let texts: Vec<String> = store.get("c1").into_iter().map(|e| e.original_text).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_clear() {
        let store = HistoryStore::default();
        store.record("c1", entry("a"));
        assert!(store.clear("c1"));
        assert!(!store.clear("c1"));
        assert_eq!(store.conversation_count(), 0);
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(entry("hi")).unwrap();
        assert_eq!(json["operation"], "translate");
        assert_eq!(json["resultText"], "hi!");
        assert!(json["createdAt"].is_string());
    }
}
