use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    /// Wraps a vector store failure. These are fatal to the current call.
    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        ApiError::StoreUnavailable(err.to_string())
    }

    pub fn model<E: std::fmt::Display>(err: E) -> Self {
        ApiError::ModelUnavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::StoreUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Document store unavailable: {}", msg),
            ),
            ApiError::ModelUnavailable(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Language model unavailable: {}", msg),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_model_errors_map_to_upstream_statuses() {
        let store = ApiError::store("disk I/O error").into_response();
        assert_eq!(store.status(), StatusCode::SERVICE_UNAVAILABLE);

        let model = ApiError::model("connection refused").into_response();
        assert_eq!(model.status(), StatusCode::BAD_GATEWAY);

        let conflict = ApiError::Conflict("paper.pdf_page1".to_string()).into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
    }
}
