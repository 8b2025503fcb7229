use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::pdf::{build_passages, DocumentInfo};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PageInput {
    pub page_num: u32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestPagesRequest {
    pub file_name: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: Vec<PageInput>,
}

pub async fn count_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let count = state.ingestor.count().await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    if query.file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("file_name is required".to_string()));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Request body is empty".to_string()));
    }

    let outcome = state.ingestor.ingest_pdf(&body, query.file_name.trim()).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(outcome)))
}

pub async fn ingest_pages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<IngestPagesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    if payload.file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("file_name is required".to_string()));
    }
    if let Some(page) = payload.pages.iter().find(|p| p.page_num == 0) {
        return Err(ApiError::BadRequest(format!(
            "page_num must be at least 1 (got {} for {})",
            page.page_num, payload.file_name
        )));
    }

    let defaults = DocumentInfo::default();
    let info = DocumentInfo {
        title: non_blank(payload.title).unwrap_or(defaults.title),
        author: non_blank(payload.author).unwrap_or(defaults.author),
    };
    let passages = build_passages(
        payload.file_name.trim(),
        &info,
        payload.pages.into_iter().map(|p| (p.page_num, p.text)),
    );

    let outcome = state.ingestor.ingest_pages(passages).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(outcome)))
}

pub async fn clear_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let outcome = state.ingestor.clear_store().await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(outcome)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handlers::test_support::{authorized, test_state};

    #[tokio::test]
    async fn pages_are_indexed_and_counted() {
        let (_dir, state) = test_state().await;

        let request = IngestPagesRequest {
            file_name: "paper.pdf".to_string(),
            title: Some("  ".to_string()),
            author: Some("Vaswani".to_string()),
            pages: vec![
                PageInput { page_num: 1, text: "Abstract".to_string() },
                PageInput { page_num: 2, text: " ".to_string() },
            ],
        };
        let response = ingest_pages(State(state.clone()), authorized(), Json(request))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let all = state.store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].metadata.title, "Untitled");
        assert_eq!(all[0].metadata.author, "Vaswani");
    }

    #[tokio::test]
    async fn page_zero_is_rejected() {
        let (_dir, state) = test_state().await;
        let request = IngestPagesRequest {
            file_name: "paper.pdf".to_string(),
            title: None,
            author: None,
            pages: vec![PageInput { page_num: 0, text: "cover".to_string() }],
        };
        let err = ingest_pages(State(state), authorized(), Json(request))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unparsable_pdf_is_unprocessable() {
        let (_dir, state) = test_state().await;
        let response = upload_pdf(
            State(state),
            authorized(),
            Query(UploadQuery { file_name: "x.pdf".to_string() }),
            Bytes::from_static(b"not a pdf"),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_api_key_is_unauthorized() {
        let (_dir, state) = test_state().await;
        let err = clear_documents(State(state), HeaderMap::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}
