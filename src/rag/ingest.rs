//! Indexing uploaded documents and clearing the store.
//!
//! Outcomes are reported as values rather than errors so the caller can show
//! the message as-is.

use std::sync::Arc;

use serde::Serialize;

use super::store::DocumentStore;
use super::types::Passage;
use crate::core::errors::ApiError;
use crate::pdf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub success: bool,
    pub message: String,
    /// Pages written to the store.
    pub pages: usize,
}

impl IngestOutcome {
    fn ok(pages: usize, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            pages,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            pages: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    pub success: bool,
    pub message: String,
    pub deleted: usize,
}

pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn ingest_pdf(&self, bytes: &[u8], file_name: &str) -> IngestOutcome {
        let passages = match pdf::extract_document(bytes, file_name) {
            Ok(passages) => passages,
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", file_name, err);
                return IngestOutcome::failed(format!("PDF parsing failed: {}", err));
            }
        };
        self.ingest_pages(passages).await
    }

    /// Adds already-extracted pages. Blank pages are skipped.
    pub async fn ingest_pages(&self, passages: Vec<Passage>) -> IngestOutcome {
        let passages: Vec<Passage> = passages
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .collect();
        if passages.is_empty() {
            return IngestOutcome::failed("PDF parsing failed: no text extracted");
        }

        match self.store.add(passages).await {
            Ok(written) => {
                tracing::info!("Indexed {} pages", written);
                IngestOutcome::ok(written, format!("Indexed {} pages", written))
            }
            Err(err) => {
                tracing::error!("Indexing failed: {}", err);
                IngestOutcome::failed(format!("Indexing failed: {}", err))
            }
        }
    }

    /// Deletes every passage while keeping the store itself usable.
    pub async fn clear_store(&self) -> ClearOutcome {
        let ids: Vec<String> = match self.store.get_all().await {
            Ok(passages) => passages.into_iter().map(|p| p.id).collect(),
            Err(err) => return clear_failed(err),
        };
        if ids.is_empty() {
            return ClearOutcome {
                success: true,
                message: "Store is already empty, no data to clear".to_string(),
                deleted: 0,
            };
        }

        match self.store.delete(&ids).await {
            Ok(deleted) => {
                tracing::info!("Cleared {} passages from the store", deleted);
                ClearOutcome {
                    success: true,
                    message: format!("Store cleared, {} passages deleted", deleted),
                    deleted,
                }
            }
            Err(err) => clear_failed(err),
        }
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        self.store.count().await
    }
}

fn clear_failed(err: impl std::fmt::Display) -> ClearOutcome {
    tracing::error!("Clearing the store failed: {}", err);
    ClearOutcome {
        success: false,
        message: format!("Clearing failed: {}", err),
        deleted: 0,
    }
}
