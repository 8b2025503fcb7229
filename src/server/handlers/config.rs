use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::AppSettings;
use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigView {
    /// Stored config with credentials masked.
    pub config: Value,
    /// Settings the running process was started with.
    pub active: AppSettings,
}

#[derive(Debug, Serialize)]
pub struct SavedConfig {
    /// Settings that apply after the next restart.
    pub pending: AppSettings,
    pub restart_required: bool,
}

pub async fn get_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ConfigView>, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    Ok(Json(ConfigView {
        config: state.config.load_masked()?,
        active: state.settings.clone(),
    }))
}

/// Replaces the stored config.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<SavedConfig>, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    save(&state, payload, false)
}

/// Overlays the payload onto the stored config.
pub async fn patch_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<SavedConfig>, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    save(&state, payload, true)
}

fn save(state: &AppState, payload: Value, merge: bool) -> Result<Json<SavedConfig>, ApiError> {
    if !payload.is_object() {
        return Err(ApiError::BadRequest("config must be a mapping".to_string()));
    }
    let pending = state.config.update_config(payload, merge)?;
    Ok(Json(SavedConfig {
        pending,
        restart_required: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::service::MASK;
    use crate::server::handlers::test_support::{authorized, test_state};
    use serde_json::json;

    #[tokio::test]
    async fn patch_reports_pending_settings_and_masks_secrets() {
        let (_dir, state) = test_state().await;

        let Json(saved) = patch_config(
            State(state.clone()),
            authorized(),
            Json(json!({ "llm": { "api_key": "sk-1" }, "retrieval": { "top_k_final": 5 } })),
        )
        .await
        .unwrap();
        assert!(saved.restart_required);
        assert_eq!(saved.pending.retrieval.top_k_final, 5);

        let Json(view) = get_config(State(state.clone()), authorized()).await.unwrap();
        assert_eq!(view.config["llm"]["api_key"], json!(MASK));
        assert_eq!(view.config["retrieval"]["top_k_final"], json!(5));
        assert_eq!(view.active.retrieval.top_k_final, state.settings.retrieval.top_k_final);
    }

    #[tokio::test]
    async fn non_mapping_payload_is_rejected() {
        let (_dir, state) = test_state().await;
        let err = update_config(State(state), authorized(), Json(json!([1, 2])))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn config_requires_api_key() {
        let (_dir, state) = test_state().await;
        let err = get_config(State(state), HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}
