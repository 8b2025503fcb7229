use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    pub top_k_coarse: Option<usize>,
    pub top_k_final: Option<usize>,
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RetrieveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    if payload.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let report = state
        .pipeline
        .retrieve_with_report(
            &payload.query,
            payload
                .top_k_coarse
                .unwrap_or(state.settings.retrieval.top_k_coarse),
            payload
                .top_k_final
                .unwrap_or(state.settings.retrieval.top_k_final),
        )
        .await?;
    Ok(Json(report))
}
