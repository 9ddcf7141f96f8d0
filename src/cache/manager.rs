//! 两级响应缓存
//!
//! 内存层同步更新，持久层尽力而为：持久层初始化失败或单次操作失败只会
//! 记录日志，缓存退化为仅内存模式，不会向调用方抛出错误。

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::durable::{DurableRecord, DurableStore, RedbStore};
use super::key::{derive_key_with, CacheKey, KeyAlgorithm, Operation};
use super::memory::{CacheEntry, MemoryTier};
use crate::gateway::GatewayResponse;

/// 默认内存层容量
pub const DEFAULT_CAPACITY: usize = 100;
/// 默认最大存活时间（24 小时）
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
/// 默认清理间隔
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// 缓存统计快照，仅用于观测
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub memory_count: usize,
    pub memory_capacity: usize,
    pub durable_count: usize,
    pub max_age_seconds: u64,
    pub durable_enabled: bool,
    pub memory_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
}

impl CacheStatsSnapshot {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.durable_hits;
        let total = hits + self.misses;
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// 一次过期清理的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub memory_removed: usize,
    pub durable_removed: usize,
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
}

/// 两级响应缓存
pub struct ResponseCache<V = GatewayResponse> {
    memory: Mutex<MemoryTier<V>>,
    durable: Option<Arc<dyn DurableStore>>,
    clock: Arc<dyn Clock>,
    algorithm: KeyAlgorithm,
    max_age_secs: u64,
    pending_writes: Mutex<JoinSet<()>>,
    sweeping: AtomicBool,
    counters: Counters,
}

impl<V> ResponseCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn builder() -> ResponseCacheBuilder<V> {
        ResponseCacheBuilder::new()
    }

    /// 派生缓存键
    pub fn key_for(
        &self,
        operation: Operation,
        service: &str,
        source_lang: &str,
        target_lang: &str,
        text: &str,
    ) -> CacheKey {
        derive_key_with(self.algorithm, operation, service, source_lang, target_lang, text)
    }

    /// 查询缓存
    ///
    /// 先查内存层；未命中时查持久层，命中则回填内存层。
    pub async fn lookup(
        &self,
        operation: Operation,
        service: &str,
        source_lang: &str,
        target_lang: &str,
        text: &str,
    ) -> Option<V> {
        let key = self.key_for(operation, service, source_lang, target_lang, text);
        self.lookup_key(&key).await
    }

    /// 按键查询
    pub async fn lookup_key(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now_secs();

        let memory_hit = self.memory.lock().await.get(key, now);
        if let Some(value) = memory_hit {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("transpolish_cache_hits_total", "tier" => "memory").increment(1);
            return Some(value);
        }

        if let Some(value) = self.lookup_durable(key, now).await {
            self.counters.durable_hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("transpolish_cache_hits_total", "tier" => "durable").increment(1);
            return Some(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("transpolish_cache_misses_total").increment(1);
        None
    }

    /// 只查内存层
    pub async fn lookup_memory(&self, key: &CacheKey) -> Option<V> {
        self.memory.lock().await.get(key, self.clock.now_secs())
    }

    async fn lookup_durable(&self, key: &CacheKey, now: u64) -> Option<V> {
        let durable = self.durable.as_ref()?;

        let record = match durable.get(key.as_str()).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, "持久缓存读取失败，按未命中处理: {}", e);
                return None;
            }
        };

        if now.saturating_sub(record.created_at) > self.max_age_secs {
            debug!(key = %key, "持久缓存条目已过期");
            return None;
        }

        let value: V = match serde_json::from_value(record.payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, "持久缓存条目无法解析，已删除: {}", e);
                if let Err(e) = durable.delete(key.as_str()).await {
                    warn!(key = %key, "删除损坏的持久缓存条目失败: {}", e);
                }
                return None;
            }
        };

        // 回填内存层，保留原始创建时间；已有更新的值时不覆盖
        let entry = CacheEntry::new(key.clone(), value.clone(), record.created_at, record.service);
        let (promoted, evicted) = self.memory.lock().await.promote(entry);
        if !promoted {
            debug!(key = %key, "内存层已有更新的条目，跳过回填");
        }
        if let Some(evicted) = evicted {
            metrics::counter!("transpolish_cache_evictions_total").increment(1);
            debug!(key = %evicted, "内存缓存淘汰");
        }

        Some(value)
    }

    /// 写入缓存
    ///
    /// 返回前内存层已更新；持久层写入在后台进行，失败只记录日志。
    pub async fn store(
        &self,
        operation: Operation,
        service: &str,
        source_lang: &str,
        target_lang: &str,
        text: &str,
        value: V,
    ) -> CacheKey {
        let key = self.key_for(operation, service, source_lang, target_lang, text);
        let created_at = self.clock.now_secs();

        let record = match &self.durable {
            Some(durable) => match serde_json::to_value(&value) {
                Ok(payload) => Some((
                    Arc::clone(durable),
                    DurableRecord {
                        key: key.to_string(),
                        created_at,
                        service: service.to_string(),
                        payload,
                    },
                )),
                Err(e) => {
                    warn!(key = %key, "缓存值无法序列化，仅写入内存层: {}", e);
                    None
                }
            },
            None => None,
        };

        // 持有写入队列锁直到后台写入登记完毕，与 clear_all 互斥
        let mut pending = self.pending_writes.lock().await;
        self.insert_memory(CacheEntry::new(key.clone(), value, created_at, service))
            .await;

        if let Some((durable, record)) = record {
            while pending.try_join_next().is_some() {}
            pending.spawn(async move {
                let key = record.key.clone();
                if let Err(e) = durable.put(record).await {
                    warn!(key = %key, "持久缓存写入失败，该条目仅保留在内存层: {}", e);
                }
            });
        }

        key
    }

    /// 等待所有后台持久层写入完成
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending_writes.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!("持久缓存写入任务异常结束: {}", e);
            }
        }
    }

    /// 删除单个条目
    pub async fn invalidate(&self, key: &CacheKey) {
        self.memory.lock().await.remove(key);
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.delete(key.as_str()).await {
                warn!(key = %key, "持久缓存删除失败: {}", e);
            }
        }
    }

    /// 清空两级缓存，不会失败
    ///
    /// 清空期间一直持有写入队列锁：之前的写入先全部落盘再被清除，
    /// 并发的 `store` 要等清空结束后才会写入两级缓存。
    pub async fn clear_all(&self) {
        let mut pending = self.pending_writes.lock().await;
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!("持久缓存写入任务异常结束: {}", e);
            }
        }

        self.memory.lock().await.clear();

        if let Some(durable) = &self.durable {
            match durable.clear().await {
                Ok(removed) => info!(removed, "持久缓存已清空"),
                Err(e) => warn!("持久缓存清空失败: {}", e),
            }
        }
    }

    /// 清理过期条目
    ///
    /// 已有清理在进行时直接返回 `None`。
    pub async fn sweep_expired(&self) -> Option<SweepReport> {
        let Some(_guard) = SweepGuard::acquire(&self.sweeping) else {
            debug!("上一次缓存清理仍在进行，跳过");
            return None;
        };

        let now = self.clock.now_secs();
        let memory_removed = self.memory.lock().await.sweep_expired(now);

        let durable_removed = match &self.durable {
            Some(durable) => {
                // created_at < now - max_age 即 now - created_at > max_age
                let cutoff = now.saturating_sub(self.max_age_secs);
                match durable.sweep_expired(cutoff).await {
                    Ok(removed) => removed,
                    Err(e) => {
                        warn!("持久缓存清理失败: {}", e);
                        0
                    }
                }
            }
            None => 0,
        };

        let report = SweepReport {
            memory_removed,
            durable_removed,
        };
        if memory_removed + durable_removed > 0 {
            info!(memory_removed, durable_removed, "缓存过期清理完成");
        }
        Some(report)
    }

    /// 统计快照
    pub async fn stats(&self) -> CacheStatsSnapshot {
        let (memory_count, memory_capacity) = {
            let memory = self.memory.lock().await;
            (memory.len(), memory.capacity())
        };

        let durable_count = match &self.durable {
            Some(durable) => durable.count().await.unwrap_or_else(|e| {
                warn!("读取持久缓存条目数失败: {}", e);
                0
            }),
            None => 0,
        };

        CacheStatsSnapshot {
            memory_count,
            memory_capacity,
            durable_count,
            max_age_seconds: self.max_age_secs,
            durable_enabled: self.durable.is_some(),
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            durable_hits: self.counters.durable_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }

    pub fn has_durable_tier(&self) -> bool {
        self.durable.is_some()
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    /// 启动定时清理任务
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> SweeperHandle {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // 第一次 tick 立即触发，跳过
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let cache = Arc::clone(&self);
                // 清理在独立任务中执行，查询不受影响
                tokio::spawn(async move {
                    cache.sweep_expired().await;
                });
            }
        });
        SweeperHandle { handle }
    }

    async fn insert_memory(&self, entry: CacheEntry<V>) {
        if let Some(evicted) = self.memory.lock().await.put(entry) {
            metrics::counter!("transpolish_cache_evictions_total").increment(1);
            debug!(key = %evicted, "内存缓存淘汰");
        }
    }
}

/// 清理标志的占用凭证，丢弃时释放
///
/// 清理的 future 在中途被取消（例如请求断开）时标志也会复位。
struct SweepGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 定时清理任务句柄，丢弃时停止任务
pub struct SweeperHandle {
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 缓存构建器
pub struct ResponseCacheBuilder<V> {
    capacity: usize,
    max_age: Duration,
    algorithm: KeyAlgorithm,
    clock: Arc<dyn Clock>,
    durable: Option<Arc<dyn DurableStore>>,
    durable_path: Option<PathBuf>,
    _value: PhantomData<fn() -> V>,
}

impl<V> ResponseCacheBuilder<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_age: DEFAULT_MAX_AGE,
            algorithm: KeyAlgorithm::default(),
            clock: Arc::new(SystemClock),
            durable: None,
            durable_path: None,
            _value: PhantomData,
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn key_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 使用已构造的持久层
    pub fn durable_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(store);
        self
    }

    /// 在 `build` 时打开 redb 文件；打开失败则退化为仅内存模式
    pub fn durable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.durable_path = Some(path.into());
        self
    }

    pub fn build(self) -> ResponseCache<V> {
        let durable = match (self.durable, self.durable_path) {
            (Some(store), _) => Some(store),
            (None, Some(path)) => match RedbStore::open(&path) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn DurableStore>),
                Err(e) => {
                    warn!(path = %path.display(), "持久缓存初始化失败，仅使用内存缓存: {}", e);
                    None
                }
            },
            (None, None) => None,
        };

        let max_age_secs = self.max_age.as_secs();

        ResponseCache {
            memory: Mutex::new(MemoryTier::new(self.capacity, max_age_secs)),
            durable,
            clock: self.clock,
            algorithm: self.algorithm,
            max_age_secs,
            pending_writes: Mutex::new(JoinSet::new()),
            sweeping: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }
}
