use axum::{body::Body, extract::State, http::Request};

use crate::api::server::http::{error::HttpError, handlers::read_body, state::AppState};

/// 原样返回请求体
pub async fn echo(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<String, HttpError> {
    let body = read_body(request.into_body(), state.settings.max_body_bytes).await?;
    Ok(format!("{}\n", body))
}
