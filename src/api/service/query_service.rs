//! 查询服务
//!
//! 显式构建的服务对象，持有结果缓存、使用计数、限流器与执行器，
//! 由请求处理器共享。一次 `run` 完成：绑定 → 计算标识 → 查缓存 →
//! 未命中时限流检查、执行并异步写回缓存。`prepare` 与 `run_prepared`
//! 可分开调用。
//!
//! 相同 queryId 的并发未命中各自独立通过限流并执行查询，不做合并。

use crate::cache::{
    CacheStats, CacheStatsSnapshot, CostPolicy, MokaResultStore, MokaUsageStore, ResultStore,
    UsageStore,
};
use crate::config::Config;
use crate::core::error::{SqlRestError, SqlRestResult};
use crate::query::{PgExecutor, QueryExecutor, QueryIdentity, ResultSet};
use crate::rate_limit::{self, RateLimiter, Unlimited};
use crate::template::{bind, BoundQuery, VariablePool};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 一次查询请求
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// SQL 模板文本
    pub template: String,
    /// 合并后的变量池
    pub pool: VariablePool,
    /// 限流使用的客户端键
    pub client: String,
}

/// 绑定并计算标识后的查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    pub bound: BoundQuery,
    pub identity: QueryIdentity,
}

/// 查询结果
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub prepared: PreparedQuery,
    pub result: Arc<ResultSet>,
    pub cache_hit: bool,
}

pub struct QueryService {
    executor: Arc<dyn QueryExecutor>,
    results: Arc<dyn ResultStore>,
    usage: Arc<dyn UsageStore>,
    limiter: Arc<dyn RateLimiter>,
    policy: CostPolicy,
    stats: Arc<CacheStats>,
    reject_unresolved_statics: bool,
}

impl QueryService {
    /// 按配置创建服务，数据库连接延迟到首次查询时建立
    pub fn new(config: &Config) -> SqlRestResult<Self> {
        let executor = PgExecutor::connect_lazy(&config.database)?;
        let service = Self::builder(Arc::new(executor))
            .with_result_store(Arc::new(MokaResultStore::new(config.cache.max_capacity)))
            .with_usage_store(Arc::new(MokaUsageStore::new(
                config.cache.max_capacity,
                Duration::from_secs(config.cache.usage_ttl_secs),
            )))
            .with_rate_limiter(Arc::from(rate_limit::from_config(&config.rate_limit)))
            .with_policy(CostPolicy::from_config(&config.cache))
            .reject_unresolved_statics(config.server.reject_unresolved_statics)
            .build();
        info!(
            "query service initialized (cache capacity={}, rate limit={})",
            config.cache.max_capacity,
            if config.rate_limit.enabled { "on" } else { "off" }
        );
        Ok(service)
    }

    pub fn builder(executor: Arc<dyn QueryExecutor>) -> QueryServiceBuilder {
        QueryServiceBuilder::new(executor)
    }

    /// 绑定模板并计算查询标识，不访问缓存与数据库
    pub fn prepare(&self, template: &str, pool: &VariablePool) -> SqlRestResult<PreparedQuery> {
        let bound = bind(template, pool)?;
        let identity = QueryIdentity::compute(&bound.sql, &bound.parameters);
        Ok(PreparedQuery { bound, identity })
    }

    pub async fn run(&self, request: QueryRequest) -> SqlRestResult<QueryOutcome> {
        let prepared = self.prepare(&request.template, &request.pool)?;
        self.run_prepared(prepared, &request.client).await
    }

    /// 执行已绑定的查询：查缓存，未命中时限流检查、执行并写回缓存
    ///
    /// 调用方在执行前就持有查询标识，失败的响应也能带上标识
    pub async fn run_prepared(
        &self,
        prepared: PreparedQuery,
        client: &str,
    ) -> SqlRestResult<QueryOutcome> {
        if self.reject_unresolved_statics && !prepared.bound.is_fully_resolved() {
            return Err(SqlRestError::UnresolvedStatic(
                prepared.bound.unresolved_statics.clone(),
            ));
        }
        let query_id = prepared.identity.query_id.clone();

        if let Some(cached) = self.results.get(&query_id).await {
            self.stats.record_hit();
            match self.usage.incr(&query_id).await {
                Ok(count) => debug!("cache hit {} (usage {})", query_id, count),
                Err(e) => warn!("failed to increment usage for {}: {}", query_id, e),
            }
            return Ok(QueryOutcome {
                prepared,
                result: cached.result,
                cache_hit: true,
            });
        }

        self.stats.record_miss();
        if !self.limiter.check(client) {
            self.stats.record_rate_limited();
            info!("rate limited {} for query {}", client, query_id);
            return Err(SqlRestError::RateLimited(client.to_string()));
        }
        if let Err(e) = self.usage.init(&query_id).await {
            warn!("failed to initialize usage for {}: {}", query_id, e);
        }

        let started = Instant::now();
        let result = Arc::new(
            self.executor
                .execute(&prepared.bound.sql, &prepared.bound.parameters)
                .await?,
        );
        let latency = started.elapsed();
        debug!(
            "cache miss {}: {} rows in {:?}",
            query_id,
            result.row_count(),
            latency
        );

        self.store_in_background(query_id, Arc::clone(&result), latency);

        Ok(QueryOutcome {
            prepared,
            result,
            cache_hit: false,
        })
    }

    /// 后台写入缓存，结果不回传给请求，失败只记录日志
    fn store_in_background(&self, query_id: String, result: Arc<ResultSet>, latency: Duration) {
        let entry = self.policy.entry(result, latency);
        let results = Arc::clone(&self.results);
        let stats = Arc::clone(&self.stats);
        tokio::spawn(async move {
            let ttl = entry.ttl;
            match results.set(query_id.clone(), entry).await {
                Ok(()) => {
                    stats.record_store();
                    debug!("cached {} for {:?}", query_id, ttl);
                }
                Err(e) => {
                    stats.record_store_failure();
                    warn!("failed to cache {}: {}", query_id, e);
                }
            }
        });
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.results.entry_count())
    }

    pub fn result_store(&self) -> &Arc<dyn ResultStore> {
        &self.results
    }

    pub fn usage_store(&self) -> &Arc<dyn UsageStore> {
        &self.usage
    }

    pub async fn shutdown(&self) {
        self.executor.close().await;
        let snapshot = self.stats();
        info!(
            "query service stopped (hits={}, misses={}, rate limited={})",
            snapshot.hits, snapshot.misses, snapshot.rate_limited
        );
    }
}

pub struct QueryServiceBuilder {
    executor: Arc<dyn QueryExecutor>,
    results: Option<Arc<dyn ResultStore>>,
    usage: Option<Arc<dyn UsageStore>>,
    limiter: Option<Arc<dyn RateLimiter>>,
    policy: CostPolicy,
    reject_unresolved_statics: bool,
}

impl QueryServiceBuilder {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            executor,
            results: None,
            usage: None,
            limiter: None,
            policy: CostPolicy::default(),
            reject_unresolved_statics: true,
        }
    }

    pub fn with_result_store(mut self, results: Arc<dyn ResultStore>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_usage_store(mut self, usage: Arc<dyn UsageStore>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_policy(mut self, policy: CostPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reject_unresolved_statics(mut self, reject: bool) -> Self {
        self.reject_unresolved_statics = reject;
        self
    }

    pub fn build(self) -> QueryService {
        let defaults = crate::config::CacheConfig::default();
        QueryService {
            executor: self.executor,
            results: self
                .results
                .unwrap_or_else(|| Arc::new(MokaResultStore::new(defaults.max_capacity))),
            usage: self.usage.unwrap_or_else(|| {
                Arc::new(MokaUsageStore::new(
                    defaults.max_capacity,
                    Duration::from_secs(defaults.usage_ttl_secs),
                ))
            }),
            limiter: self.limiter.unwrap_or_else(|| Arc::new(Unlimited)),
            policy: self.policy,
            stats: Arc::new(CacheStats::default()),
            reject_unresolved_statics: self.reject_unresolved_statics,
        }
    }
}
