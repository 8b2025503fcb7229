use std::sync::Arc;

use crate::chat::{ChatService, SessionStore};
use crate::core::config::{AppPaths, AppSettings, ConfigService};
use crate::core::security::{init_session_token, SessionToken};
use crate::llm::{build_provider, LlmProvider, ProviderEmbedder};
use crate::rag::{DocumentStore, Ingestor, RetrievalPipeline, SqliteDocumentStore};

pub mod error;

use error::InitializationError;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: AppSettings,
    pub session_token: SessionToken,
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub pipeline: Arc<RetrievalPipeline>,
    pub ingestor: Arc<Ingestor>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// Loads configuration, connects the model provider and opens both
    /// databases under the user data directory.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let session_token = init_session_token(paths.as_ref());

        let llm = build_provider(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?;
        if !llm.health_check().await.unwrap_or(false) {
            tracing::warn!(
                "LLM provider {} at {} is not reachable yet",
                llm.name(),
                settings.llm.base_url
            );
        }

        let embedder = Arc::new(ProviderEmbedder::new(
            llm.clone(),
            settings.llm.embedding_model.clone(),
        ));
        let store: Arc<dyn DocumentStore> = Arc::new(
            SqliteDocumentStore::new(paths.as_ref(), embedder, settings.store.duplicate_policy)
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );

        let sessions = SessionStore::new(paths.sessions_db_path.clone())
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let pipeline = Arc::new(RetrievalPipeline::from_settings(
            store.clone(),
            llm.clone(),
            &settings,
        ));
        let ingestor = Arc::new(Ingestor::new(store.clone()));
        let chat = Arc::new(ChatService::new(
            sessions,
            pipeline.clone(),
            llm.clone(),
            settings.clone(),
        ));

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            session_token,
            llm,
            store,
            pipeline,
            ingestor,
            chat,
        }))
    }
}
