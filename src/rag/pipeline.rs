//! Retrieval orchestrator: coarse recall, rerank, then context completion.
//!
//! The three stages run strictly in sequence for one query. "No results" is
//! an empty list; only store and model connectivity failures are errors.

use std::sync::Arc;

use serde::Serialize;

use super::completer::ContextCompleter;
use super::reranker::{DroppedCandidate, RelevanceReranker, RerankerConfig};
use super::retriever::CoarseRetriever;
use super::store::DocumentStore;
use super::types::EnrichedPassage;
use crate::core::config::AppSettings;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

/// Per-call diagnostics alongside the enriched passages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalReport {
    pub passages: Vec<EnrichedPassage>,
    pub coarse_count: usize,
    pub below_threshold: usize,
    pub dropped: Vec<DroppedCandidate>,
}

pub struct RetrievalPipeline {
    store: Arc<dyn DocumentStore>,
    retriever: CoarseRetriever,
    reranker: RelevanceReranker,
    completer: ContextCompleter,
}

impl RetrievalPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        reranker: RelevanceReranker,
        completer: ContextCompleter,
    ) -> Self {
        Self {
            retriever: CoarseRetriever::new(store.clone()),
            store,
            reranker,
            completer,
        }
    }

    pub fn from_settings(
        store: Arc<dyn DocumentStore>,
        judge: Arc<dyn LlmProvider>,
        settings: &AppSettings,
    ) -> Self {
        Self::new(
            store,
            RelevanceReranker::new(
                judge,
                RerankerConfig::from_settings(&settings.llm, &settings.retrieval),
            ),
            ContextCompleter::new(settings.retrieval.context_excerpt_chars),
        )
    }

    pub async fn retrieve(
        &self,
        query: &str,
        top_k_coarse: usize,
        top_k_final: usize,
    ) -> Result<Vec<EnrichedPassage>, ApiError> {
        Ok(self
            .retrieve_with_report(query, top_k_coarse, top_k_final)
            .await?
            .passages)
    }

    pub async fn retrieve_with_report(
        &self,
        query: &str,
        top_k_coarse: usize,
        top_k_final: usize,
    ) -> Result<RetrievalReport, ApiError> {
        if top_k_coarse == 0 || top_k_final == 0 {
            return Err(ApiError::BadRequest(
                "top_k_coarse and top_k_final must be at least 1".to_string(),
            ));
        }

        let candidates = self.retriever.retrieve(query, top_k_coarse).await?;
        let coarse_count = candidates.len();
        if candidates.is_empty() {
            tracing::info!("Coarse recall found nothing for query");
            return Ok(RetrievalReport::default());
        }

        let rerank = self.reranker.rerank(query, candidates, top_k_final).await;
        if rerank.ranked.is_empty() {
            return Ok(RetrievalReport {
                passages: Vec::new(),
                coarse_count,
                below_threshold: rerank.below_threshold,
                dropped: rerank.dropped,
            });
        }

        // one snapshot per call, shared by every finalist
        let snapshot = self.store.get_all().await?;
        let passages = self.completer.complete(rerank.ranked, &snapshot);

        tracing::info!(
            "Retrieved {} passages ({} coarse candidates)",
            passages.len(),
            coarse_count
        );
        Ok(RetrievalReport {
            passages,
            coarse_count,
            below_threshold: rerank.below_threshold,
            dropped: rerank.dropped,
        })
    }
}
