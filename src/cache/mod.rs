//! 响应缓存
//!
//! - `key` - 缓存键派生
//! - `clock` - 时间源
//! - `memory` - 有界 FIFO 内存层
//! - `durable` - 基于 redb 的持久层
//! - `manager` - 两级缓存门面

pub mod clock;
pub mod durable;
pub mod key;
pub mod manager;
pub mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use durable::{DurableRecord, DurableStore, RedbStore};
pub use key::{derive_key, derive_key_with, CacheKey, KeyAlgorithm, Operation};
pub use manager::{
    CacheStatsSnapshot, ResponseCache, ResponseCacheBuilder, SweepReport, SweeperHandle,
};
pub use memory::{CacheEntry, MemoryTier};
