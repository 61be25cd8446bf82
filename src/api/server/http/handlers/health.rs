use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::json;

use crate::api::server::http::state::AppState;

pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "sqlrest",
            "version": env!("CARGO_PKG_VERSION"),
            "cache": state.service.stats(),
        })),
    )
}
