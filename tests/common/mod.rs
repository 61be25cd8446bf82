//! 集成测试共享工具模块
//!
//! 提供内存中的查询执行器与服务构建辅助函数

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlrest::api::service::{QueryRequest, QueryService};
use sqlrest::core::error::{SqlRestError, SqlRestResult};
use sqlrest::query::{CellValue, QueryExecutor, ResultSet};
use sqlrest::template::VariablePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 内存执行器：返回固定结果并记录每次调用
#[derive(Default)]
pub struct StubExecutor {
    calls: AtomicUsize,
    executed: Mutex<Vec<(String, Vec<String>)>>,
    failure: Option<SqlRestError>,
    delay: Option<Duration>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(err: SqlRestError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<(String, Vec<String>)> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn execute(&self, sql: &str, parameters: &[String]) -> SqlRestResult<ResultSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executed
            .lock()
            .push((sql.to_string(), parameters.to_vec()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(sample_result(parameters))
    }
}

/// 每个绑定参数一列，外加一个浮点列与一个空值列
pub fn sample_result(parameters: &[String]) -> ResultSet {
    let mut columns: Vec<String> = (1..=parameters.len()).map(|i| format!("p{}", i)).collect();
    columns.push("ratio".to_string());
    columns.push("note".to_string());

    let mut result = ResultSet::new(columns);
    let mut row: Vec<CellValue> = parameters.iter().map(|p| CellValue::from(p.as_str())).collect();
    row.push(CellValue::Float(0.5));
    row.push(CellValue::Null);
    result.push_row(row);
    result
}

pub fn pool(vars: &[(&str, &str)]) -> VariablePool {
    vars.iter().copied().collect()
}

pub fn request(template: &str, vars: &[(&str, &str)]) -> QueryRequest {
    QueryRequest {
        template: template.to_string(),
        pool: pool(vars),
        client: "127.0.0.1".to_string(),
    }
}

pub fn service_with(executor: Arc<StubExecutor>) -> QueryService {
    QueryService::builder(executor).build()
}

/// 等待后台缓存写入可见
pub async fn wait_until_cached(service: &QueryService, query_id: &str) {
    for _ in 0..100 {
        if service.result_store().get(query_id).await.is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("query {} was never cached", query_id);
}
