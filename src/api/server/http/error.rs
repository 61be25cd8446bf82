use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;

use crate::core::error::SqlRestError;

/// 请求边界的错误类型，所有内部错误在这里统一转换为传输层状态码
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    TooManyRequests(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<SqlRestError> for HttpError {
    fn from(err: SqlRestError) -> Self {
        match err {
            SqlRestError::RateLimited(_) => HttpError::TooManyRequests(err.to_string()),
            SqlRestError::TemplateParse(_)
            | SqlRestError::UndefinedVariable(_)
            | SqlRestError::UnresolvedStatic(_)
            | SqlRestError::InvalidRequest(_) => HttpError::BadRequest(err.to_string()),
            SqlRestError::Connection(_)
            | SqlRestError::QueryExecution(_)
            | SqlRestError::RowScan(_)
            | SqlRestError::Cache(_)
            | SqlRestError::Internal(_) => {
                error!("request failed: {}", err);
                HttpError::InternalError(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SqlRestError::RateLimited("c".to_string()), StatusCode::TOO_MANY_REQUESTS),
            (SqlRestError::UndefinedVariable("x".to_string()), StatusCode::BAD_REQUEST),
            (SqlRestError::UnresolvedStatic(vec!["s".to_string()]), StatusCode::BAD_REQUEST),
            (SqlRestError::QueryExecution("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (SqlRestError::Connection("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let response = HttpError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
