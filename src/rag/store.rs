//! `DocumentStore`: the interface over the passage vector store.
//!
//! The retrieval pipeline only reads through this trait. The primary
//! implementation is `SqliteDocumentStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{Candidate, Passage};
use crate::core::errors::ApiError;

/// What `add` does when a passage id is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the stored text, metadata and embedding.
    #[default]
    Overwrite,
    /// Fail the whole batch without writing anything.
    Reject,
}

impl DuplicatePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Some(Self::Overwrite),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Abstract trait for passage storage backends.
///
/// Every mutation is persisted before the call returns. Failures are
/// reported as `ApiError::StoreUnavailable` and never retried here.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a batch, embedding each passage's text. Returns the number written.
    async fn add(&self, passages: Vec<Passage>) -> Result<usize, ApiError>;

    /// Up to `k` passages closest to `text`, sorted by ascending distance.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<Candidate>, ApiError>;

    /// Every stored passage, in store order.
    async fn get_all(&self) -> Result<Vec<Passage>, ApiError>;

    /// Delete the given ids. Returns how many rows were removed.
    async fn delete(&self, ids: &[String]) -> Result<usize, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;
}
