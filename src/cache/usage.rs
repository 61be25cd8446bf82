//! 使用计数
//!
//! 每次缓存命中时计数加一，仅用于观测。保留时长长于结果缓存。

use super::traits::UsageStore;
use crate::core::error::{SqlRestError, SqlRestResult};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 基于 moka 的使用计数
#[derive(Clone)]
pub struct MokaUsageStore {
    counters: Cache<String, Arc<AtomicU64>>,
}

impl MokaUsageStore {
    pub fn new(max_capacity: u64, retention: Duration) -> Self {
        Self {
            counters: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(retention)
                .build(),
        }
    }
}

#[async_trait]
impl UsageStore for MokaUsageStore {
    async fn init(&self, query_id: &str) -> SqlRestResult<()> {
        self.counters
            .get_with_by_ref(query_id, async { Arc::new(AtomicU64::new(0)) })
            .await;
        Ok(())
    }

    async fn incr(&self, query_id: &str) -> SqlRestResult<u64> {
        match self.counters.get(query_id).await {
            Some(counter) => Ok(counter.fetch_add(1, Ordering::Relaxed) + 1),
            None => Err(SqlRestError::Cache(format!(
                "usage counter for {} is not initialized",
                query_id
            ))),
        }
    }

    async fn count(&self, query_id: &str) -> Option<u64> {
        self.counters
            .get(query_id)
            .await
            .map(|counter| counter.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MokaUsageStore {
        MokaUsageStore::new(100, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_incr_after_init() {
        let usage = store();
        usage.init("q").await.expect("init should succeed");
        assert_eq!(usage.count("q").await, Some(0));
        assert_eq!(usage.incr("q").await.expect("incr should succeed"), 1);
        assert_eq!(usage.incr("q").await.expect("incr should succeed"), 2);
        assert_eq!(usage.count("q").await, Some(2));
    }

    #[tokio::test]
    async fn test_incr_without_init_fails() {
        let usage = store();
        assert!(matches!(usage.incr("missing").await, Err(SqlRestError::Cache(_))));
        assert_eq!(usage.count("missing").await, None);
    }

    #[tokio::test]
    async fn test_reinit_keeps_existing_count() {
        let usage = store();
        usage.init("q").await.expect("init should succeed");
        usage.incr("q").await.expect("incr should succeed");
        usage.init("q").await.expect("init should succeed");
        assert_eq!(usage.count("q").await, Some(1));
    }
}
