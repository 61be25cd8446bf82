use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use log::info;
use std::time::Instant;

use crate::api::server::http::handlers::REQUEST_ID_HEADER;

pub async fn logging_middleware(
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    info!(
        "{} {} -> {} ({:?}, request {})",
        method,
        uri,
        response.status(),
        started.elapsed(),
        request_id
    );

    response
}
