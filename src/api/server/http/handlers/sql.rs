use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use log::warn;

use crate::api::server::http::{
    error::HttpError,
    handlers::{
        client_key, collect_variables, read_body, PARAMETERS_HEADER, PARAMETERS_ID_HEADER,
        POWERED_BY, POWERED_BY_HEADER, QUERY_HEADER, QUERY_ID_HEADER, REQUEST_ID_HEADER,
        STATEMENT_HEADER, STATEMENT_ID_HEADER,
    },
    state::AppState,
};
use crate::api::service::PreparedQuery;
use crate::config::OutputFormat;
use crate::query::{render_json, render_tsv, FormatTable};

const TSV_CONTENT_TYPE: &str = "text/tab-separated-values; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// 执行 SQL 模板
///
/// 请求体为模板，变量来自查询参数与 Cookie，`_float`、`_int` 指定数值列格式。
///
/// 绑定参数一律以 TEXT 类型发送，与非文本列比较时占位符需要显式转换，
/// 如 `where id = {{id}}::bigint`。
///
/// 服务响应头总是输出；模板绑定成功后的失败响应同样带有查询标识
pub async fn select(State(state): State<AppState>, request: Request<Body>) -> Response {
    let mut headers = HeaderMap::new();
    set_service_headers(&mut headers);

    let mut response = match execute(&state, request, &mut headers).await {
        Ok((content_type, body)) => {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
            body.into_response()
        }
        Err(err) => err.into_response(),
    };
    for (name, value) in headers.iter() {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

/// 绑定后立即写入标识响应头，再执行查询并渲染响应体
async fn execute(
    state: &AppState,
    request: Request<Body>,
    headers: &mut HeaderMap,
) -> Result<(&'static str, String), HttpError> {
    let (parts, body) = request.into_parts();
    let template = read_body(body, state.settings.max_body_bytes).await?;
    let collected = collect_variables(&parts);
    let formats = FormatTable::from_reserved(&collected.reserved);

    let prepared = state.service.prepare(&template, &collected.pool)?;
    set_identity_headers(headers, &prepared);
    if parts.headers.contains_key(&state.settings.debug_header) {
        set_debug_headers(headers, &prepared);
    }

    let outcome = state
        .service
        .run_prepared(prepared, &client_key(&parts))
        .await?;

    Ok(match state.settings.output {
        OutputFormat::Tsv => (TSV_CONTENT_TYPE, render_tsv(&outcome.result, &formats)),
        OutputFormat::Json => (JSON_CONTENT_TYPE, render_json(&outcome.result, &formats)),
    })
}

fn set_service_headers(headers: &mut HeaderMap) {
    let request_id = uuid::Uuid::new_v4().simple().to_string();
    set_header(headers, REQUEST_ID_HEADER, &request_id);
    headers.insert(POWERED_BY_HEADER, HeaderValue::from_static(POWERED_BY));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}

fn set_identity_headers(headers: &mut HeaderMap, prepared: &PreparedQuery) {
    let identity = &prepared.identity;
    for (name, value) in [
        (STATEMENT_ID_HEADER, identity.statement_id.as_str()),
        (QUERY_ID_HEADER, identity.query_id.as_str()),
        (PARAMETERS_ID_HEADER, identity.parameter_id.as_str()),
    ] {
        set_header(headers, name, value);
    }
}

/// 调试响应头会暴露语句与参数，只在请求携带调试标记时输出
fn set_debug_headers(headers: &mut HeaderMap, prepared: &PreparedQuery) {
    let bound = &prepared.bound;
    set_header(headers, STATEMENT_HEADER, &bound.sql);
    set_header(headers, QUERY_HEADER, &bound.inline_repr());
    set_header(headers, PARAMETERS_HEADER, &bound.parameters_repr());
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match header_value(value) {
        Some(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        None => warn!("dropping unrepresentable {} header", name),
    }
}

/// 换行等控制字符替换为空格，使多行语句也能作为响应头
pub(crate) fn header_value(value: &str) -> Option<HeaderValue> {
    let sanitized: String = value
        .chars()
        .map(|c| if c.is_control() && c != '\t' { ' ' } else { c })
        .collect();
    HeaderValue::from_bytes(sanitized.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_flattens_newlines() {
        let value = header_value("select 1\nfrom t\r\nwhere a=$1").expect("valid header");
        assert_eq!(value.as_bytes(), b"select 1 from t  where a=$1");
    }

    #[test]
    fn test_header_value_keeps_utf8() {
        let value = header_value("select 'héllo'").expect("valid header");
        assert_eq!(value.as_bytes(), "select 'héllo'".as_bytes());
    }
}
