//! 查询执行
//!
//! `QueryExecutor` 是与数据库之间的接缝，服务层只依赖该特征；
//! `PgExecutor` 基于 sqlx 连接池执行绑定后的语句

use super::value::{CellValue, ResultSet};
use crate::config::DatabaseConfig;
use crate::core::error::{SqlRestError, SqlRestResult};
use async_trait::async_trait;
use log::{debug, info};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgPoolOptions, PgRow, PgTypeInfo, PgTypeKind};
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{Column, Executor, PgPool, Row, TypeInfo, ValueRef};
use std::time::Duration;

/// 查询执行器
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// 以位置参数执行语句，返回列名与全部行
    async fn execute(&self, sql: &str, parameters: &[String]) -> SqlRestResult<ResultSet>;

    /// 释放底层资源
    async fn close(&self) {}
}

/// PostgreSQL 执行器
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// 创建执行器，连接在首次使用时建立
    pub fn connect_lazy(config: &DatabaseConfig) -> SqlRestResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy(&config.url)
            .map_err(|e| SqlRestError::Connection(e.to_string()))?;
        info!(
            "database pool configured (max_connections={})",
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 没有返回行时，通过语句描述取得列名
    async fn describe_columns(&self, sql: &str) -> SqlRestResult<Vec<String>> {
        let described = (&self.pool).describe(sql).await?;
        Ok(described
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute(&self, sql: &str, parameters: &[String]) -> SqlRestResult<ResultSet> {
        let mut query = sqlx::query(sql);
        // 参数声明为 TEXT，由语句中的显式转换决定实际类型
        for parameter in parameters {
            query = query.bind(parameter.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        debug!("query returned {} rows", rows.len());

        let Some(first) = rows.first() else {
            return Ok(ResultSet::new(self.describe_columns(sql).await?));
        };

        let mut result = ResultSet::new(
            first
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        );
        for row in &rows {
            result.push_row(decode_row(row)?);
        }
        Ok(result)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &PgRow) -> SqlRestResult<Vec<CellValue>> {
    (0..row.columns().len())
        .map(|index| decode_cell(row, index))
        .collect()
}

/// 单元格解码方式
///
/// 结果列以二进制格式传输，只有二进制表示恰好是文本的类型才能按字符串读取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellDecoder {
    Int8,
    Int4,
    Int2,
    Float8,
    Float4,
    Text,
    Bool,
    Numeric,
    Json,
    Uuid,
    Interval,
    Timestamptz,
    Timestamp,
    Date,
    Time,
    Unsupported,
}

impl CellDecoder {
    fn for_type_name(name: &str) -> Self {
        match name {
            "INT8" => CellDecoder::Int8,
            "INT4" => CellDecoder::Int4,
            "INT2" => CellDecoder::Int2,
            "FLOAT8" => CellDecoder::Float8,
            "FLOAT4" => CellDecoder::Float4,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" | "UNKNOWN" | "CITEXT" => {
                CellDecoder::Text
            }
            "BOOL" => CellDecoder::Bool,
            "NUMERIC" => CellDecoder::Numeric,
            "JSON" | "JSONB" => CellDecoder::Json,
            "UUID" => CellDecoder::Uuid,
            "INTERVAL" => CellDecoder::Interval,
            "TIMESTAMPTZ" => CellDecoder::Timestamptz,
            "TIMESTAMP" => CellDecoder::Timestamp,
            "DATE" => CellDecoder::Date,
            "TIME" => CellDecoder::Time,
            _ => CellDecoder::Unsupported,
        }
    }

    fn for_column(type_info: &PgTypeInfo) -> Self {
        match Self::for_type_name(type_info.name()) {
            // 枚举的二进制表示就是标签文本
            CellDecoder::Unsupported if matches!(type_info.kind(), PgTypeKind::Enum(_)) => {
                CellDecoder::Text
            }
            decoder => decoder,
        }
    }
}

/// 按列的数据库类型解码单元格
fn decode_cell(row: &PgRow, index: usize) -> SqlRestResult<CellValue> {
    let type_info = row.column(index).type_info();
    let cell = match CellDecoder::for_column(type_info) {
        CellDecoder::Int8 => row.try_get::<Option<i64>, _>(index)?.into(),
        CellDecoder::Int4 => row.try_get::<Option<i32>, _>(index)?.into(),
        CellDecoder::Int2 => row.try_get::<Option<i16>, _>(index)?.into(),
        CellDecoder::Float8 => row.try_get::<Option<f64>, _>(index)?.into(),
        CellDecoder::Float4 => row.try_get::<Option<f32>, _>(index)?.into(),
        CellDecoder::Text => row.try_get_unchecked::<Option<String>, _>(index)?.into(),
        CellDecoder::Bool => other(row.try_get::<Option<bool>, _>(index)?),
        CellDecoder::Numeric => other(row.try_get::<Option<BigDecimal>, _>(index)?),
        CellDecoder::Json => other(row.try_get::<Option<JsonValue>, _>(index)?),
        CellDecoder::Uuid => other(row.try_get::<Option<Uuid>, _>(index)?),
        CellDecoder::Interval => row
            .try_get::<Option<PgInterval>, _>(index)?
            .map(|interval| CellValue::Other(format_interval(&interval)))
            .unwrap_or(CellValue::Null),
        CellDecoder::Timestamptz => {
            other(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?)
        }
        CellDecoder::Timestamp => other(row.try_get::<Option<chrono::NaiveDateTime>, _>(index)?),
        CellDecoder::Date => other(row.try_get::<Option<chrono::NaiveDate>, _>(index)?),
        CellDecoder::Time => other(row.try_get::<Option<chrono::NaiveTime>, _>(index)?),
        CellDecoder::Unsupported => {
            if row.try_get_raw(index)?.is_null() {
                CellValue::Null
            } else {
                CellValue::Other(format!("<{}>", type_info.name().to_lowercase()))
            }
        }
    };
    Ok(cell)
}

fn other<T: ToString>(value: Option<T>) -> CellValue {
    value
        .map(|v| CellValue::Other(v.to_string()))
        .unwrap_or(CellValue::Null)
}

/// 按 PostgreSQL 默认输出风格渲染时间间隔，如 `1 year 2 mons 3 days 04:05:06.5`
fn format_interval(interval: &PgInterval) -> String {
    fn unit(value: i64, singular: &str, plural: &str) -> String {
        format!("{} {}", value, if value.abs() == 1 { singular } else { plural })
    }

    let mut parts = Vec::new();
    let years = i64::from(interval.months / 12);
    let months = i64::from(interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(unit(i64::from(interval.days), "day", "days"));
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let (secs, micros) = (total / 1_000_000, total % 1_000_000);
        let mut time = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if micros != 0 {
            let fraction = format!("{:06}", micros);
            time.push('.');
            time.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}
