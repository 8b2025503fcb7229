//! Multi-stage retrieval over indexed document pages.
//!
//! - `CoarseRetriever`: vector-similarity recall from a `DocumentStore`
//! - `RelevanceReranker`: LLM-judged 0–10 relevance scores with a fixed threshold
//! - `ContextCompleter`: appends neighbouring-page excerpts to the finalists
//! - `RetrievalPipeline`: runs the three stages for one query

pub mod completer;
pub mod ingest;
pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod sqlite;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use completer::ContextCompleter;
pub use ingest::{ClearOutcome, IngestOutcome, Ingestor};
pub use pipeline::{RetrievalPipeline, RetrievalReport};
pub use reranker::{RelevanceReranker, RerankerConfig, RELEVANCE_THRESHOLD};
pub use retriever::CoarseRetriever;
pub use sqlite::SqliteDocumentStore;
pub use store::{DocumentStore, DuplicatePolicy};
pub use types::{Candidate, EnrichedPassage, Passage, PassageMetadata};
