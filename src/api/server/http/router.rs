use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use super::{
    handlers::{health, sql, template, usage},
    middleware::{error, logging},
    state::AppState,
};

pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let max_body_bytes = state.settings.max_body_bytes;
    Router::new()
        .route("/", get(usage::echo).post(usage::echo))
        .route("/health", get(health::check))
        .route("/sql", get(sql::select).post(sql::select))
        .route("/test", post(template::dry_run))
        .layer(middleware::from_fn(logging::logging_middleware))
        .layer(middleware::from_fn(error::error_handling_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}
