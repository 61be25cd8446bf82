use axum::{body::Body, extract::State, http::Request};

use crate::api::server::http::{
    error::HttpError,
    handlers::{collect_variables, read_body},
    state::AppState,
};

/// 模板试绑定：返回绑定后的文本与参数列表，不访问缓存、限流器与数据库
pub async fn dry_run(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<String, HttpError> {
    let (parts, body) = request.into_parts();
    let template = read_body(body, state.settings.max_body_bytes).await?;
    let collected = collect_variables(&parts);

    let prepared = state.service.prepare(&template, &collected.pool)?;
    Ok(format!(
        "{}\nparameters {}\n",
        prepared.bound.sql,
        prepared.bound.parameters_repr()
    ))
}
