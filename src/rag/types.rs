//! Passage records flowing through indexing and retrieval.

use serde::{Deserialize, Serialize};

pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const UNTITLED: &str = "Untitled";

/// Source attribution for one indexed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub file_name: String,
    /// 1-based page number within `file_name`.
    pub page_num: u32,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

fn default_title() -> String {
    UNTITLED.to_string()
}

/// The text of one source page plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub metadata: PassageMetadata,
}

impl Passage {
    pub fn new(text: impl Into<String>, metadata: PassageMetadata) -> Self {
        Self {
            id: passage_id(&metadata.file_name, metadata.page_num),
            text: text.into(),
            metadata,
        }
    }
}

/// Deterministic id for a (file, page) pair.
pub fn passage_id(file_name: &str, page_num: u32) -> String {
    format!("{}_page{}", file_name, page_num)
}

/// A passage recalled by the coarse stage for a single query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub passage: Passage,
    /// Coarse-stage dissimilarity, lower is more similar.
    pub distance: f32,
    /// Reranker score in [0, 10]; `None` until reranked.
    pub score: Option<f32>,
}

impl Candidate {
    pub fn new(passage: Passage, distance: f32) -> Self {
        Self {
            passage,
            distance,
            score: None,
        }
    }
}

/// A finalist after context completion.
///
/// `passage.text` has the neighbouring excerpts appended; the original text is
/// not kept separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPassage {
    pub passage: Passage,
    pub distance: f32,
    pub score: f32,
    /// Neighbouring pages whose excerpts were appended, in append order.
    pub context_pages: Vec<u32>,
}

/// Returns at most `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
