//! 持久缓存层
//!
//! 通用的异步键值接口，以及基于 redb 的本地文件实现。所有 redb 操作都在
//! 阻塞线程池中执行，避免占用异步运行时。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{helpers::durable_error, RelayError, RelayResult};

/// 持久层记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableRecord {
    pub key: String,
    pub created_at: u64,
    pub service: String,
    pub payload: serde_json::Value,
}

/// 持久层接口
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// 读取记录，不做过期判断
    async fn get(&self, key: &str) -> RelayResult<Option<DurableRecord>>;

    /// 写入记录，已存在时覆盖
    async fn put(&self, record: DurableRecord) -> RelayResult<()>;

    /// 删除记录
    async fn delete(&self, key: &str) -> RelayResult<bool>;

    /// 清空所有记录
    async fn clear(&self) -> RelayResult<usize>;

    /// 删除 `created_at < cutoff` 的记录，返回删除数量
    async fn sweep_expired(&self, cutoff: u64) -> RelayResult<usize>;

    /// 记录总数
    async fn count(&self) -> RelayResult<usize>;
}

const RESPONSES: TableDefinition<&str, &[u8]> = TableDefinition::new("responses");

fn redb_error<E: Into<redb::Error>>(error: E) -> RelayError {
    durable_error(error.into())
}

/// 基于 redb 的持久层
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStore {
    /// 打开（或创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> RelayResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| durable_error(format!("无法创建目录 {}: {}", parent.display(), e)))?;
            }
        }

        let db = Database::create(&path).map_err(redb_error)?;

        // 预先建表，只读事务才不会因为表不存在而失败
        let txn = db.begin_write().map_err(redb_error)?;
        txn.open_table(RESPONSES).map_err(redb_error)?;
        txn.commit().map_err(redb_error)?;

        info!(path = %path.display(), "持久缓存已打开");

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run_blocking<T, F>(&self, op: F) -> RelayResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> RelayResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| durable_error(format!("后台任务失败: {}", e)))?
    }
}

#[async_trait]
impl DurableStore for RedbStore {
    async fn get(&self, key: &str) -> RelayResult<Option<DurableRecord>> {
        let key = key.to_string();
        self.run_blocking(move |db| {
            let txn = db.begin_read().map_err(redb_error)?;
            let table = txn.open_table(RESPONSES).map_err(redb_error)?;
            match table.get(key.as_str()).map_err(redb_error)? {
                Some(bytes) => {
                    let record = serde_json::from_slice(bytes.value())?;
                    Ok(Some(record))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn put(&self, record: DurableRecord) -> RelayResult<()> {
        self.run_blocking(move |db| {
            let bytes = serde_json::to_vec(&record)?;
            let txn = db.begin_write().map_err(redb_error)?;
            {
                let mut table = txn.open_table(RESPONSES).map_err(redb_error)?;
                table
                    .insert(record.key.as_str(), bytes.as_slice())
                    .map_err(redb_error)?;
            }
            txn.commit().map_err(redb_error)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> RelayResult<bool> {
        let key = key.to_string();
        self.run_blocking(move |db| {
            let txn = db.begin_write().map_err(redb_error)?;
            let removed = {
                let mut table = txn.open_table(RESPONSES).map_err(redb_error)?;
                let removed = table.remove(key.as_str()).map_err(redb_error)?.is_some();
                removed
            };
            txn.commit().map_err(redb_error)?;
            Ok(removed)
        })
        .await
    }

    async fn clear(&self) -> RelayResult<usize> {
        self.run_blocking(|db| {
            let txn = db.begin_write().map_err(redb_error)?;
            let removed = {
                let table = txn.open_table(RESPONSES).map_err(redb_error)?;
                let removed = table.len().map_err(redb_error)?;
                removed
            };
            txn.delete_table(RESPONSES).map_err(redb_error)?;
            txn.open_table(RESPONSES).map_err(redb_error)?;
            txn.commit().map_err(redb_error)?;
            Ok(usize::try_from(removed).unwrap_or(usize::MAX))
        })
        .await
    }

    async fn sweep_expired(&self, cutoff: u64) -> RelayResult<usize> {
        self.run_blocking(move |db| {
            let txn = db.begin_write().map_err(redb_error)?;
            let removed = {
                let mut table = txn.open_table(RESPONSES).map_err(redb_error)?;

                let mut expired = Vec::new();
                for item in table.iter().map_err(redb_error)? {
                    let (key, value) = item.map_err(redb_error)?;
                    match serde_json::from_slice::<DurableRecord>(value.value()) {
                        Ok(record) if record.created_at >= cutoff => {}
                        // 过期或无法解析的记录一并清理
                        _ => expired.push(key.value().to_string()),
                    }
                }

                for key in &expired {
                    table.remove(key.as_str()).map_err(redb_error)?;
                }
                expired.len()
            };
            txn.commit().map_err(redb_error)?;

            if removed > 0 {
                debug!(removed, "持久缓存过期条目已清理");
            }
            Ok(removed)
        })
        .await
    }

    async fn count(&self) -> RelayResult<usize> {
        self.run_blocking(|db| {
            let txn = db.begin_read().map_err(redb_error)?;
            let table = txn.open_table(RESPONSES).map_err(redb_error)?;
            let len = table.len().map_err(redb_error)?;
            Ok(usize::try_from(len).unwrap_or(usize::MAX))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, created_at: u64) -> DurableRecord {
        DurableRecord {
            key: key.to_string(),
            created_at,
            service: "gpt".to_string(),
            payload: serde_json::json!({ "translatedText": key }),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("cache.redb")).unwrap();

        assert!(store.get("a").await.unwrap().is_none());
        store.put(record("a", 10)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(record("a", 10)));
        assert_eq!(store.count().await.unwrap(), 1);

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("nested/cache.redb")).unwrap();

        store.put(record("old", 10)).await.unwrap();
        store.put(record("new", 100)).await.unwrap();
        assert_eq!(store.sweep_expired(50).await.unwrap(), 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("new").await.unwrap().is_some());

        assert_eq!(store.clear().await.unwrap(), 1);
        assert_eq!(store.clear().await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.put(record("persisted", 1)).await.unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert!(store.get("persisted").await.unwrap().is_some());
    }
}
