//! 缓存时长策略
//!
//! 缓存时长 = 成本单位 × 执行耗时的整秒数，执行越慢的查询保留越久。
//! 整秒数为零时使用默认时长。

use crate::config::CacheConfig;
use crate::query::ResultSet;
use std::sync::Arc;
use std::time::Duration;

/// 一条缓存结果
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub result: Arc<ResultSet>,
    /// 缓存未命中时测得的执行耗时
    pub cost: Duration,
    /// 由耗时换算出的缓存时长
    pub ttl: Duration,
}

/// 由执行耗时计算缓存时长
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostPolicy {
    pub cost_unit: Duration,
    pub default_ttl: Duration,
}

impl CostPolicy {
    pub fn new(cost_unit: Duration, default_ttl: Duration) -> Self {
        Self {
            cost_unit,
            default_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::from_secs(config.cost_unit_secs),
            Duration::from_secs(config.default_ttl_secs),
        )
    }

    pub fn lifetime(&self, latency: Duration) -> Duration {
        let whole_secs = u32::try_from(latency.as_secs()).unwrap_or(u32::MAX);
        let lifetime = self.cost_unit.saturating_mul(whole_secs);
        if lifetime.is_zero() {
            self.default_ttl
        } else {
            lifetime
        }
    }

    pub fn entry(&self, result: Arc<ResultSet>, latency: Duration) -> CachedResult {
        CachedResult {
            result,
            cost: latency,
            ttl: self.lifetime(latency),
        }
    }
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn policy() -> CostPolicy {
        CostPolicy::new(HOUR, Duration::from_secs(300))
    }

    #[test]
    fn test_lifetime_scales_with_whole_seconds() {
        assert_eq!(policy().lifetime(Duration::from_millis(1_000)), HOUR);
        assert_eq!(policy().lifetime(Duration::from_millis(2_999)), HOUR * 2);
        assert_eq!(policy().lifetime(Duration::from_secs(5)), HOUR * 5);
    }

    #[test]
    fn test_sub_second_latency_uses_default() {
        assert_eq!(policy().lifetime(Duration::from_millis(999)), Duration::from_secs(300));
        assert_eq!(policy().lifetime(Duration::ZERO), Duration::from_secs(300));
    }

    #[test]
    fn test_lifetime_saturates() {
        let lifetime = policy().lifetime(Duration::from_secs(u64::MAX));
        assert_eq!(lifetime, HOUR.saturating_mul(u32::MAX));
    }

    #[test]
    fn test_entry_records_cost() {
        let entry = policy().entry(Arc::new(ResultSet::default()), Duration::from_millis(1500));
        assert_eq!(entry.cost, Duration::from_millis(1500));
        assert_eq!(entry.ttl, HOUR);
    }

    #[test]
    fn test_default_policy_uses_hour_unit() {
        assert_eq!(CostPolicy::default().cost_unit, HOUR);
    }
}
