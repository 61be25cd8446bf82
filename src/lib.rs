//! sql.rest - SQL over HTTP
//!
//! 调用方提交带命名占位符的 SQL 模板，请求参数（URL 查询参数、Cookie）
//! 被安全地转换为位置绑定参数后执行。结果按内容派生的查询标识缓存，
//! 以表格或结构化形式返回。

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod query;
pub mod rate_limit;
pub mod template;
pub mod utils;
