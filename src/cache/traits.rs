//! 缓存特征定义
//!
//! 结果缓存与使用计数都由共享的过期键值存储承担，服务层只执行原子的
//! get/set/incr 操作，不持有额外的锁

use super::policy::CachedResult;
use crate::core::error::SqlRestResult;
use async_trait::async_trait;

/// 查询结果存储，以 queryId 为键
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// 获取未过期的缓存结果
    async fn get(&self, query_id: &str) -> Option<CachedResult>;

    /// 写入缓存结果，过期时间取自条目的 `ttl`
    async fn set(&self, query_id: String, entry: CachedResult) -> SqlRestResult<()>;

    /// 移除缓存项
    async fn invalidate(&self, query_id: &str);

    /// 当前条目数（近似值）
    fn entry_count(&self) -> u64;
}

/// 使用计数存储，生命周期独立于结果缓存
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// 确保计数器存在，已存在时保持原值
    async fn init(&self, query_id: &str) -> SqlRestResult<()>;

    /// 计数加一并返回新值，计数器不存在时返回错误
    async fn incr(&self, query_id: &str) -> SqlRestResult<u64>;

    /// 当前计数
    async fn count(&self, query_id: &str) -> Option<u64>;
}
