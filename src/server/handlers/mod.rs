pub mod config;
pub mod documents;
pub mod health;
pub mod retrieval;
pub mod sessions;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::http::{HeaderMap, HeaderValue};

    use crate::chat::{ChatService, SessionStore};
    use crate::core::config::{AppPaths, AppSettings, ConfigService};
    use crate::core::security::SessionToken;
    use crate::rag::sqlite::SqliteDocumentStore;
    use crate::rag::testing::{LetterEmbedder, Reply, ScriptedJudge};
    use crate::rag::{DocumentStore, DuplicatePolicy, Ingestor, RetrievalPipeline};
    use crate::state::AppState;

    pub const TOKEN: &str = "test-token";

    pub fn authorized() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static(TOKEN));
        headers
    }

    /// State over temp databases, a letter-histogram embedder and a model
    /// that always replies "8".
    pub async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = Arc::new(AppPaths::with_data_dir(
            dir.path().to_path_buf(),
            dir.path().join("data"),
        ));
        let settings = AppSettings::default();
        let llm = Arc::new(ScriptedJudge::new(Reply::Text("8".to_string())));

        let store: Arc<dyn DocumentStore> = Arc::new(
            SqliteDocumentStore::new(paths.as_ref(), Arc::new(LetterEmbedder), DuplicatePolicy::Overwrite)
                .await
                .expect("store"),
        );
        let sessions = SessionStore::new(paths.sessions_db_path.clone())
            .await
            .expect("sessions");
        let pipeline = Arc::new(RetrievalPipeline::from_settings(
            store.clone(),
            llm.clone(),
            &settings,
        ));

        let state = AppState {
            config: ConfigService::new(paths.clone()),
            paths,
            session_token: SessionToken::new(TOKEN),
            llm: llm.clone(),
            ingestor: Arc::new(Ingestor::new(store.clone())),
            chat: Arc::new(ChatService::new(sessions, pipeline.clone(), llm, settings.clone())),
            settings,
            store,
            pipeline,
        };
        (dir, Arc::new(state))
    }
}
