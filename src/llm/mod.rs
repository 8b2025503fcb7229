pub mod embedder;
pub mod lmstudio;
pub mod ollama;
pub mod provider;
pub mod types;

use std::sync::Arc;

use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;

pub use embedder::{Embedder, ProviderEmbedder};
pub use provider::LlmProvider;
pub use types::GenerateRequest;

/// Builds the provider named by `llm.provider`.
pub fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ApiError> {
    let provider: Arc<dyn LlmProvider> = match settings.provider.as_str() {
        "ollama" => Arc::new(ollama::OllamaProvider::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.request_timeout(),
        )?),
        "lmstudio" => Arc::new(lmstudio::LmStudioProvider::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.request_timeout(),
        )?),
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unknown LLM provider: {}",
                other
            )))
        }
    };
    Ok(provider)
}
