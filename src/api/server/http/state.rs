use crate::api::service::QueryService;
use crate::config::{OutputFormat, ServerConfig};
use axum::http::HeaderName;
use std::sync::Arc;

/// 处理器使用的 HTTP 层设置
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub output: OutputFormat,
    pub debug_header: HeaderName,
    pub max_body_bytes: usize,
}

impl HttpSettings {
    pub fn from_config(config: &ServerConfig) -> Result<Self, String> {
        let debug_header = HeaderName::from_bytes(config.debug_header.trim().as_bytes())
            .map_err(|e| format!("无效的调试请求头 {}: {}", config.debug_header, e))?;
        Ok(Self {
            output: config.output,
            debug_header,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            output: OutputFormat::Tsv,
            debug_header: HeaderName::from_static("x-sql-debug"),
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    pub fn new(service: Arc<QueryService>, settings: HttpSettings) -> Self {
        Self {
            service,
            settings: Arc::new(settings),
        }
    }
}
