pub mod health;
pub mod sql;
pub mod template;
pub mod usage;

pub use health::check;
pub use sql::select;
pub use template::dry_run;
pub use usage::echo;

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, request::Parts},
};
use std::net::SocketAddr;

use crate::api::server::http::error::HttpError;
use crate::rate_limit::ANONYMOUS_CLIENT;
use crate::template::{CollectedVariables, VariableCollector};

pub const POWERED_BY_HEADER: &str = "x-powered-by";
pub const POWERED_BY: &str = "sql.rest";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const STATEMENT_ID_HEADER: &str = "x-sql-statement-id";
pub const QUERY_ID_HEADER: &str = "x-sql-query-id";
pub const PARAMETERS_ID_HEADER: &str = "x-sql-parameters-id";
pub const STATEMENT_HEADER: &str = "x-sql-statement";
pub const QUERY_HEADER: &str = "x-sql-query";
pub const PARAMETERS_HEADER: &str = "x-sql-parameters";

/// 读取 UTF-8 请求体
pub(crate) async fn read_body(body: Body, limit: usize) -> Result<String, HttpError> {
    let bytes = to_bytes(body, limit)
        .await
        .map_err(|e| HttpError::BadRequest(format!("读取请求体失败: {}", e)))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| HttpError::BadRequest("请求体不是有效的 UTF-8 文本".to_string()))
}

/// 从查询串与 Cookie 收集变量
pub(crate) fn collect_variables(parts: &Parts) -> CollectedVariables {
    VariableCollector::new()
        .with_query(parts.uri.query())
        .with_cookies(
            parts
                .headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        )
        .finish()
}

/// 限流使用的客户端键：对端 IP
pub(crate) fn client_key(parts: &Parts) -> String {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}
