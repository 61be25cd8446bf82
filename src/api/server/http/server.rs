//! HTTP 服务器

use super::router::create_router;
use super::state::{AppState, HttpSettings};
use crate::api::service::QueryService;
use crate::config::Config;
use anyhow::Result;
use log::info;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// HTTP 服务器
pub struct HttpServer {
    state: AppState,
    listen_addr: String,
    request_timeout: Duration,
}

impl HttpServer {
    pub fn new(service: Arc<QueryService>, config: &Config) -> Result<Self> {
        let settings = HttpSettings::from_config(&config.server).map_err(anyhow::Error::msg)?;
        Ok(Self {
            state: AppState::new(service, settings),
            listen_addr: config.listen_addr(),
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        })
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone(), self.request_timeout)
    }

    /// 监听并处理请求，直到 `shutdown` 完成
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;
        Ok(())
    }
}
