use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub indexed_pages: usize,
    pub llm_provider: String,
    pub llm_reachable: bool,
    pub judge_model: String,
    pub answer_model: String,
    pub embedding_model: String,
}

pub async fn health(State(_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Store size and model reachability. A down model server is reported, not
/// raised; a broken store is an error.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusReport>, ApiError> {
    let indexed_pages = state.store.count().await?;
    let llm_reachable = match state.llm.health_check().await {
        Ok(reachable) => reachable,
        Err(err) => {
            tracing::warn!("Model server health check failed: {}", err);
            false
        }
    };
    let llm = &state.settings.llm;

    Ok(Json(StatusReport {
        indexed_pages,
        llm_provider: state.llm.name().to_string(),
        llm_reachable,
        judge_model: llm.judge_model.clone(),
        answer_model: llm.answer_model.clone(),
        embedding_model: llm.embedding_model.clone(),
    }))
}
