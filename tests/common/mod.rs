// 集成测试公共模块
//
// 提供测试替身和缓存构建辅助工具

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use transpolish::cache::{DurableRecord, DurableStore, ManualClock, ResponseCache};
use transpolish::error::{RelayError, RelayResult};
use transpolish::{GatewayResponse, Provider};

/// 测试起始时间（Unix 秒）
pub const START: u64 = 1_700_000_000;

/// 一小时
pub const HOUR: u64 = 60 * 60;

/// 构造网关响应
pub fn response(original: &str, translated: &str) -> GatewayResponse {
    GatewayResponse {
        original_text: original.to_string(),
        translated_text: translated.to_string(),
        service: "openai".to_string(),
        error: None,
    }
}

/// 临时目录下的 redb 文件路径
pub fn durable_path(dir: &TempDir) -> PathBuf {
    dir.path().join("cache.redb")
}

/// 带 redb 持久层的缓存
pub fn redb_cache(path: &Path, clock: &ManualClock, capacity: usize, max_age_secs: u64) -> ResponseCache {
    ResponseCache::<GatewayResponse>::builder()
        .capacity(capacity)
        .max_age(Duration::from_secs(max_age_secs))
        .clock(Arc::new(clock.clone()))
        .durable_path(path)
        .build()
}

/// 使用指定持久层的缓存
pub fn cache_with_store(
    store: Arc<dyn DurableStore>,
    clock: &ManualClock,
    capacity: usize,
    max_age_secs: u64,
) -> ResponseCache {
    ResponseCache::<GatewayResponse>::builder()
        .capacity(capacity)
        .max_age(Duration::from_secs(max_age_secs))
        .clock(Arc::new(clock.clone()))
        .durable_store(store)
        .build()
}

/// 仅内存层的缓存
pub fn memory_cache(clock: &ManualClock, capacity: usize, max_age_secs: u64) -> ResponseCache {
    ResponseCache::<GatewayResponse>::builder()
        .capacity(capacity)
        .max_age(Duration::from_secs(max_age_secs))
        .clock(Arc::new(clock.clone()))
        .build()
}

/// 返回固定格式结果的服务商，记录调用次数
pub struct FakeProvider {
    name: String,
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl FakeProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            fail: false,
            delay: None,
        }
    }

    /// 每次调用都返回服务商错误
    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    /// 每次调用前等待
    pub fn slow(name: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(name)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, _system: &str, user: &str) -> RelayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RelayError::Provider(format!("{} unavailable", self.name)));
        }
        Ok(format!("[{}] {}", self.name, user))
    }

    async fn polish(&self, text: &str, style: &str) -> RelayResult<String> {
        let polished = self.complete("", text).await?;
        Ok(format!("{} ({})", polished, style))
    }
}

/// 所有操作都失败的持久层
pub struct FailingStore;

#[async_trait]
impl DurableStore for FailingStore {
    async fn get(&self, _key: &str) -> RelayResult<Option<DurableRecord>> {
        Err(RelayError::DurableUnavailable("read failed".to_string()))
    }

    async fn put(&self, _record: DurableRecord) -> RelayResult<()> {
        Err(RelayError::DurableUnavailable("quota exceeded".to_string()))
    }

    async fn delete(&self, _key: &str) -> RelayResult<bool> {
        Err(RelayError::DurableUnavailable("delete failed".to_string()))
    }

    async fn clear(&self) -> RelayResult<usize> {
        Err(RelayError::DurableUnavailable("clear failed".to_string()))
    }

    async fn sweep_expired(&self, _cutoff: u64) -> RelayResult<usize> {
        Err(RelayError::DurableUnavailable("sweep failed".to_string()))
    }

    async fn count(&self) -> RelayResult<usize> {
        Err(RelayError::DurableUnavailable("count failed".to_string()))
    }
}

/// 基于 HashMap 的持久层，读取、清空和清理都可以被挂起
#[derive(Default)]
pub struct MapStore {
    records: Mutex<HashMap<String, DurableRecord>>,
    get_gate: Option<Gate>,
    clear_gate: Option<Gate>,
    sweep_gate: Option<Gate>,
}

/// 操作进行到一半时通知 `entered`，等待 `release` 后继续
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Gate {
    async fn pass(gate: &Option<Gate>) {
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清理开始后挂起
    pub fn gated(gate: Gate) -> Self {
        Self {
            sweep_gate: Some(gate),
            ..Self::default()
        }
    }

    /// 读出记录后、返回前挂起
    pub fn with_get_gate(mut self, gate: Gate) -> Self {
        self.get_gate = Some(gate);
        self
    }

    /// 清空开始前挂起
    pub fn with_clear_gate(mut self, gate: Gate) -> Self {
        self.clear_gate = Some(gate);
        self
    }

    pub fn insert(&self, record: DurableRecord) {
        self.records.lock().unwrap().insert(record.key.clone(), record);
    }

    pub fn record(&self, key: &str) -> Option<DurableRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl DurableStore for MapStore {
    async fn get(&self, key: &str) -> RelayResult<Option<DurableRecord>> {
        let record = self.record(key);
        Gate::pass(&self.get_gate).await;
        Ok(record)
    }

    async fn put(&self, record: DurableRecord) -> RelayResult<()> {
        self.insert(record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> RelayResult<bool> {
        Ok(self.records.lock().unwrap().remove(key).is_some())
    }

    async fn clear(&self) -> RelayResult<usize> {
        Gate::pass(&self.clear_gate).await;
        let mut records = self.records.lock().unwrap();
        let removed = records.len();
        records.clear();
        Ok(removed)
    }

    async fn sweep_expired(&self, cutoff: u64) -> RelayResult<usize> {
        Gate::pass(&self.sweep_gate).await;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, record| record.created_at >= cutoff);
        Ok(before - records.len())
    }

    async fn count(&self) -> RelayResult<usize> {
        Ok(self.records.lock().unwrap().len())
    }
}
