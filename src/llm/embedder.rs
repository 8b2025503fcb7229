//! Embedding function used by the document store.

use std::sync::Arc;

use async_trait::async_trait;

use super::provider::LlmProvider;
use crate::core::errors::ApiError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds every input, returning vectors in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}

/// Embeds through an `LlmProvider` with a fixed embedding model.
#[derive(Clone)]
pub struct ProviderEmbedder {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.provider.embed(inputs, &self.model).await?;
        if vectors.len() != inputs.len() {
            return Err(ApiError::model(format!(
                "embedding count mismatch: {} != {}",
                vectors.len(),
                inputs.len()
            )));
        }
        Ok(vectors)
    }
}
