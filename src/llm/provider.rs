use async_trait::async_trait;

use super::types::GenerateRequest;
use crate::core::errors::ApiError;

/// A local model server that can judge passages, answer questions and embed
/// page text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend identifier reported by `/api/status`.
    fn name(&self) -> &str;

    /// Whether the server answers at all. Unreachable is `Ok(false)`.
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// One non-streaming completion. The reply is returned untouched,
    /// reasoning blocks included.
    async fn generate(&self, request: GenerateRequest) -> Result<String, ApiError>;

    /// One vector per input, in input order.
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
