//! 服务层
//!
//! 与传输协议无关的查询服务

pub mod query_service;

pub use query_service::{
    PreparedQuery, QueryOutcome, QueryRequest, QueryService, QueryServiceBuilder,
};
