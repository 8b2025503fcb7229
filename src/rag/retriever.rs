//! Coarse recall: a generous similarity query whose precision is left to the
//! reranker.

use std::sync::Arc;

use super::store::DocumentStore;
use super::types::Candidate;
use crate::core::errors::ApiError;

pub struct CoarseRetriever {
    store: Arc<dyn DocumentStore>,
}

impl CoarseRetriever {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Returns at most `top_k` candidates ordered by non-decreasing distance.
    ///
    /// No filtering happens here. Store failures propagate.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>, ApiError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut candidates = self.store.query(query, top_k).await?;

        // stable: ties stay in store order
        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(top_k);

        tracing::debug!("Coarse recall returned {} candidates", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::{page, OrderedStore};

    #[tokio::test]
    async fn returns_at_most_top_k_in_distance_order() {
        let store = OrderedStore::with_passages(
            (1..=6).map(|n| page("a.pdf", n, "text")).collect(),
        );
        let retriever = CoarseRetriever::new(Arc::new(store));

        let candidates = retriever.retrieve("query", 4).await.unwrap();
        assert_eq!(candidates.len(), 4);
        assert!(candidates.windows(2).all(|w| w[0].distance <= w[1].distance));

        let all = retriever.retrieve("query", 50).await.unwrap();
        assert_eq!(all.len(), 6);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let retriever = CoarseRetriever::new(Arc::new(OrderedStore::failing()));
        let err = retriever.retrieve("query", 10).await.unwrap_err();
        assert!(matches!(err, ApiError::StoreUnavailable(_)));
    }
}
