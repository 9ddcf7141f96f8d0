//! 内存缓存层
//!
//! 容量有界，满时按插入顺序淘汰最早的条目（FIFO）。
//! 底层是 `LruCache`，读取只用 `peek`，所以访问不会改变淘汰顺序。

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use super::key::CacheKey;

/// 缓存条目
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    pub value: V,
    /// 创建时间（Unix 秒）
    pub created_at: u64,
    /// 冗余保存的服务名，用于统计
    pub service: String,
}

impl<V> CacheEntry<V> {
    pub fn new(key: CacheKey, value: V, created_at: u64, service: impl Into<String>) -> Self {
        Self {
            key,
            value,
            created_at,
            service: service.into(),
        }
    }

    /// `now - created_at > max_age` 时视为过期
    pub fn is_expired(&self, now: u64, max_age_secs: u64) -> bool {
        now.saturating_sub(self.created_at) > max_age_secs
    }
}

/// 内存缓存层
pub struct MemoryTier<V> {
    entries: LruCache<CacheKey, CacheEntry<V>>,
    max_age_secs: u64,
}

impl<V: Clone> MemoryTier<V> {
    /// 创建内存缓存层，容量至少为 1
    pub fn new(capacity: usize, max_age_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            max_age_secs,
        }
    }

    /// 查询条目；过期条目不会返回
    pub fn get(&self, key: &CacheKey, now: u64) -> Option<V> {
        self.entries
            .peek(key)
            .filter(|entry| !entry.is_expired(now, self.max_age_secs))
            .map(|entry| entry.value.clone())
    }

    /// 插入或覆盖条目，返回被淘汰条目的键
    ///
    /// 覆盖已有键时保留其原有的插入位置。
    pub fn put(&mut self, entry: CacheEntry<V>) -> Option<CacheKey> {
        if let Some(existing) = self.entries.peek_mut(&entry.key) {
            *existing = entry;
            return None;
        }

        let evicted = self
            .entries
            .push(entry.key.clone(), entry)
            .map(|(key, _)| key);
        if let Some(key) = &evicted {
            debug!(key = %key, "内存缓存已满，淘汰最早插入的条目");
        }
        evicted
    }

    /// 从持久层回填
    ///
    /// 只有键不存在，或已有条目比回填条目更旧时才写入，
    /// 避免并发写入的新值被旧记录覆盖。返回是否写入以及被淘汰的键。
    pub fn promote(&mut self, entry: CacheEntry<V>) -> (bool, Option<CacheKey>) {
        let newer_present = self
            .entries
            .peek(&entry.key)
            .is_some_and(|existing| existing.created_at >= entry.created_at);
        if newer_present {
            return (false, None);
        }
        (true, self.put(entry))
    }

    /// 删除条目
    pub fn remove(&mut self, key: &CacheKey) -> bool {
        self.entries.pop(key).is_some()
    }

    /// 清理所有过期条目，返回清理数量
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let max_age = self.max_age_secs;
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, max_age))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }

    /// 清空
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    /// 按插入顺序列出当前的键，最早插入的在前
    pub fn keys_in_order(&self) -> Vec<CacheKey> {
        self.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }
}
