use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{config, documents, health, retrieval, sessions};
use crate::state::AppState;

/// Uploaded PDFs may be far larger than axum's 2 MiB default.
const MAX_PDF_BYTES: usize = 100 * 1024 * 1024;

const LOCAL_ORIGINS: [&str; 7] = [
    "http://localhost",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:8501",
];

fn document_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/documents", delete(documents::clear_documents))
        .route("/api/documents/count", get(documents::count_documents))
        .route(
            "/api/documents/pdf",
            post(documents::upload_pdf).layer(DefaultBodyLimit::max(MAX_PDF_BYTES)),
        )
        .route("/api/documents/pages", post(documents::ingest_pages))
        .route("/api/retrieve", post(retrieval::retrieve))
}

fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route("/api/sessions/:session_id", delete(sessions::delete_session))
        .route(
            "/api/sessions/:session_id/messages",
            get(sessions::get_session_messages).post(sessions::post_message),
        )
}

/// Creates the application router with CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route(
            "/api/config",
            get(config::get_config)
                .post(config::update_config)
                .patch(config::patch_config),
        )
        .merge(document_routes())
        .merge(session_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(configured: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(configured)))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ])
}

/// Configured origins replace the local defaults entirely. Entries that are
/// not valid header values are skipped with a warning.
fn allowed_origins(configured: &[String]) -> Vec<HeaderValue> {
    let parsed: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    if !parsed.is_empty() {
        return parsed;
    }
    LOCAL_ORIGINS
        .iter()
        .map(|origin| HeaderValue::from_static(origin))
        .collect()
}
