use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use tokio::signal;

pub mod server;
pub mod service;

use crate::api::server::HttpServer;
use crate::api::service::QueryService;
use crate::config::Config;
use crate::template::{bind, VariablePool};
use crate::utils::logging;

/// 加载配置文件，失败时回退到默认配置
pub fn load_config(config_path: &str) -> Config {
    match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load config from '{}': {}, using default config",
                config_path, e
            );
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    }
}

pub async fn start_service(config_path: String) -> Result<()> {
    let config = load_config(&config_path);

    if let Err(e) = logging::init(&config) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    info!("Configuration loaded from {}", config_path);

    let service = Arc::new(QueryService::new(&config)?);
    let server = HttpServer::new(Arc::clone(&service), &config)?;

    let result = server.serve(shutdown_signal()).await;
    if let Err(e) = &result {
        warn!("HTTP server stopped with error: {}", e);
    }

    info!("Shutting down sql.rest service...");
    service.shutdown().await;
    logging::shutdown();
    result
}

/// 离线绑定模板并打印结果，不连接数据库
pub fn bind_template(template: &str, vars: &[(String, String)]) -> Result<String> {
    let pool: VariablePool = vars.iter().cloned().collect();
    let bound = bind(template, &pool)?;
    let mut out = format!("{}\nparameters {}", bound.sql, bound.parameters_repr());
    if !bound.is_fully_resolved() {
        out.push_str(&format!(
            "\nunresolved static variables: {}",
            bound.unresolved_statics.join(", ")
        ));
    }
    Ok(out)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
