//! 请求限流
//!
//! 仅在缓存未命中时咨询。默认实现为按客户端划分的令牌桶，令牌在每次检查时按流逝时间补充。
//! 令牌桶存放在有容量上限的缓存中：空闲到足以补满的桶会被淘汰，
//! 之后再次出现的客户端拿到的新桶与补满的旧桶等价。

use crate::config::RateLimitConfig;
use log::debug;
use moka::sync::Cache;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 无法识别客户端地址时使用的键
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// 默认同时跟踪的客户端上限
pub const DEFAULT_MAX_CLIENTS: u64 = 10_000;

/// 空闲淘汰时间的上限，补充极慢时桶最多保留这么久
const MAX_IDLE: Duration = Duration::from_secs(3600);

/// 限流器
pub trait RateLimiter: Send + Sync {
    /// 尝试为客户端消耗一个令牌，返回是否放行
    fn check(&self, client: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// 按客户端的令牌桶限流器
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Cache<String, Arc<Mutex<Bucket>>>,
}

impl TokenBucketLimiter {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self::bounded(capacity, refill_per_sec, DEFAULT_MAX_CLIENTS)
    }

    pub fn bounded(capacity: u32, refill_per_sec: f64, max_clients: u64) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_per_sec,
            buckets: Cache::builder()
                .max_capacity(max_clients)
                .time_to_idle(idle_timeout(capacity, refill_per_sec))
                .build(),
        }
    }

    /// 当前跟踪的客户端数量
    pub fn tracked_clients(&self) -> u64 {
        self.buckets.run_pending_tasks();
        self.buckets.entry_count()
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let bucket = self.buckets.get_with_by_ref(client, || {
            Arc::new(Mutex::new(Bucket {
                tokens: self.capacity,
                refilled_at: now,
            }))
        });
        let mut bucket = bucket.lock();

        let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            debug!("rate limit exhausted for {}", client);
            false
        }
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }
}

/// 空桶补满所需的时间，以 `MAX_IDLE` 为上限
fn idle_timeout(capacity: f64, refill_per_sec: f64) -> Duration {
    if refill_per_sec <= 0.0 {
        return MAX_IDLE;
    }
    let secs = capacity / refill_per_sec;
    if secs >= MAX_IDLE.as_secs_f64() {
        MAX_IDLE
    } else {
        Duration::from_secs_f64(secs.max(1.0))
    }
}

/// 不做限制
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn check(&self, _client: &str) -> bool {
        true
    }
}

/// 按配置构建限流器
pub fn from_config(config: &RateLimitConfig) -> Box<dyn RateLimiter> {
    if config.enabled {
        Box::new(TokenBucketLimiter::bounded(
            config.capacity,
            config.refill_per_sec,
            config.max_clients,
        ))
    } else {
        Box::new(Unlimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_drains_then_rejects() {
        let limiter = TokenBucketLimiter::new(3, 1.0);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let limiter = TokenBucketLimiter::new(1, 2.0);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now + Duration::from_millis(100)));
        assert!(limiter.check_at("a", now + Duration::from_millis(700)));
    }

    #[test]
    fn test_refill_is_capped_at_capacity() {
        let limiter = TokenBucketLimiter::new(2, 100.0);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        let later = now + Duration::from_secs(60);
        assert!(limiter.check_at("a", later));
        assert!(limiter.check_at("a", later));
        assert!(!limiter.check_at("a", later));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = TokenBucketLimiter::new(1, 0.001);
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_tracked_clients_are_bounded() {
        let limiter = TokenBucketLimiter::bounded(10, 1.0, 100);
        for i in 0..5_000 {
            assert!(limiter.check(&format!("10.{}.{}.{}", i / 65536, i / 256 % 256, i % 256)));
        }
        assert!(limiter.tracked_clients() <= 100);
    }

    #[test]
    fn test_idle_timeout_matches_full_refill() {
        assert_eq!(idle_timeout(10.0, 1.0), Duration::from_secs(10));
        assert_eq!(idle_timeout(10.0, 20.0), Duration::from_secs(1));
        assert_eq!(idle_timeout(1.0, 0.0001), MAX_IDLE);
        assert_eq!(idle_timeout(1.0, 0.0), MAX_IDLE);
    }

    #[test]
    fn test_from_config() {
        let mut config = RateLimitConfig {
            enabled: false,
            capacity: 1,
            refill_per_sec: 0.001,
            max_clients: 10,
        };
        let limiter = from_config(&config);
        for _ in 0..10 {
            assert!(limiter.check(ANONYMOUS_CLIENT));
        }

        config.enabled = true;
        let limiter = from_config(&config);
        assert!(limiter.check(ANONYMOUS_CLIENT));
        assert!(!limiter.check(ANONYMOUS_CLIENT));
    }
}
