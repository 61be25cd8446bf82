//! 结果缓存模块
//!
//! 以 queryId 为键缓存查询结果，缓存时长由执行耗时决定；另有独立的使用计数

pub mod policy;
pub mod result_store;
pub mod stats;
pub mod traits;
pub mod usage;

pub use policy::{CachedResult, CostPolicy};
pub use result_store::MokaResultStore;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use traits::{ResultStore, UsageStore};
pub use usage::MokaUsageStore;
