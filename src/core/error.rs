//! 统一错误处理 for sql.rest
//!
//! 两个层级：
//! - 参数级错误（清洗拒绝）只记录告警，不会出现在这里
//! - 请求级错误统一为 `SqlRestError`，由 HTTP 边界转换为传输层状态码

use thiserror::Error;

/// 请求级错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlRestError {
    #[error("模板解析失败: {0}")]
    TemplateParse(String),

    #[error("未定义的变量: {0}")]
    UndefinedVariable(String),

    #[error("未提供的静态变量: {}", .0.join(", "))]
    UnresolvedStatic(Vec<String>),

    #[error("无效的请求: {0}")]
    InvalidRequest(String),

    #[error("请求频率超限: {0}")]
    RateLimited(String),

    #[error("数据库连接失败: {0}")]
    Connection(String),

    #[error("查询执行失败: {0}")]
    QueryExecution(String),

    #[error("结果读取失败: {0}")]
    RowScan(String),

    #[error("缓存错误: {0}")]
    Cache(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl SqlRestError {
    /// 是否属于调用方可修正的错误
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SqlRestError::TemplateParse(_)
                | SqlRestError::UndefinedVariable(_)
                | SqlRestError::UnresolvedStatic(_)
                | SqlRestError::InvalidRequest(_)
                | SqlRestError::RateLimited(_)
        )
    }
}

impl From<sqlx::Error> for SqlRestError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => SqlRestError::Connection(err.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_) => SqlRestError::RowScan(err.to_string()),
            _ => SqlRestError::QueryExecution(err.to_string()),
        }
    }
}

/// 请求级结果类型
pub type SqlRestResult<T> = Result<T, SqlRestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_static_message_lists_names() {
        let err = SqlRestError::UnresolvedStatic(vec!["source".to_string(), "table".to_string()]);
        assert_eq!(err.to_string(), "未提供的静态变量: source, table");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(SqlRestError::RateLimited("127.0.0.1".to_string()).is_client_error());
        assert!(SqlRestError::UndefinedVariable("name".to_string()).is_client_error());
        assert!(!SqlRestError::QueryExecution("boom".to_string()).is_client_error());
        assert!(!SqlRestError::Connection("refused".to_string()).is_client_error());
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: SqlRestError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, SqlRestError::Connection(_)));

        let err: SqlRestError = sqlx::Error::ColumnNotFound("value".to_string()).into();
        assert!(matches!(err, SqlRestError::RowScan(_)));

        let err: SqlRestError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, SqlRestError::QueryExecution(_)));
    }
}
