//! 基于 moka 的结果缓存

use super::policy::CachedResult;
use super::traits::ResultStore;
use crate::core::error::SqlRestResult;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// 按条目自身的 `ttl` 过期
struct CostExpiry;

impl Expiry<String, CachedResult> for CostExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedResult,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedResult,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 线程安全的结果缓存
#[derive(Clone)]
pub struct MokaResultStore {
    store: Cache<String, CachedResult>,
}

impl MokaResultStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            store: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(CostExpiry)
                .build(),
        }
    }

    /// 执行挂起的维护任务，使条目数与过期状态立即可见
    pub async fn sync(&self) {
        self.store.run_pending_tasks().await;
    }
}

#[async_trait]
impl ResultStore for MokaResultStore {
    async fn get(&self, query_id: &str) -> Option<CachedResult> {
        self.store.get(query_id).await
    }

    async fn set(&self, query_id: String, entry: CachedResult) -> SqlRestResult<()> {
        self.store.insert(query_id, entry).await;
        Ok(())
    }

    async fn invalidate(&self, query_id: &str) {
        self.store.invalidate(query_id).await;
    }

    fn entry_count(&self) -> u64 {
        self.store.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ResultSet;
    use std::sync::Arc;

    fn entry(ttl: Duration) -> CachedResult {
        CachedResult {
            result: Arc::new(ResultSet::new(vec!["a".to_string()])),
            cost: Duration::ZERO,
            ttl,
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MokaResultStore::new(100);
        assert!(store.get("q1").await.is_none());

        store
            .set("q1".to_string(), entry(Duration::from_secs(60)))
            .await
            .expect("set should succeed");
        let cached = store.get("q1").await.expect("entry should be cached");
        assert_eq!(cached.result.columns, vec!["a"]);

        store.sync().await;
        assert_eq!(store.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let store = MokaResultStore::new(100);
        store
            .set("short".to_string(), entry(Duration::from_millis(50)))
            .await
            .expect("set should succeed");
        store
            .set("long".to_string(), entry(Duration::from_secs(60)))
            .await
            .expect("set should succeed");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get("short").await.is_none());
        assert!(store.get("long").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let store = MokaResultStore::new(100);
        store
            .set("q".to_string(), entry(Duration::from_secs(60)))
            .await
            .expect("set should succeed");
        store.invalidate("q").await;
        assert!(store.get("q").await.is_none());
    }
}
