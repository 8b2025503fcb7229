//! Deterministic stand-ins for the embedder, the judgment model and the store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::store::DocumentStore;
use super::types::{Candidate, Passage, PassageMetadata, UNKNOWN_AUTHOR};
use crate::core::errors::ApiError;
use crate::llm::{Embedder, GenerateRequest, LlmProvider};

pub fn page(file_name: &str, page_num: u32, text: &str) -> Passage {
    Passage::new(
        text,
        PassageMetadata {
            file_name: file_name.to_string(),
            page_num,
            author: UNKNOWN_AUTHOR.to_string(),
            title: format!("{} title", file_name),
        },
    )
}

/// 26-dimensional letter histogram.
pub struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; 26];
                for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
                    vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                }
                vector
            })
            .collect())
    }
}

/// Store whose similarity order is insertion order.
///
/// Distances are `0.1 * position`, so the first inserted passage is closest
/// to every query.
#[derive(Default)]
pub struct OrderedStore {
    passages: Mutex<Vec<Passage>>,
    pub snapshot_calls: AtomicUsize,
    pub fail_queries: bool,
}

impl OrderedStore {
    pub fn with_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages: Mutex::new(passages),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_queries: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl DocumentStore for OrderedStore {
    async fn add(&self, passages: Vec<Passage>) -> Result<usize, ApiError> {
        let count = passages.len();
        let mut stored = self.passages.lock().unwrap();
        for passage in passages {
            match stored.iter_mut().find(|p| p.id == passage.id) {
                Some(existing) => *existing = passage,
                None => stored.push(passage),
            }
        }
        Ok(count)
    }

    async fn query(&self, _text: &str, k: usize) -> Result<Vec<Candidate>, ApiError> {
        if self.fail_queries {
            return Err(ApiError::store("connection refused"));
        }
        let stored = self.passages.lock().unwrap();
        Ok(stored
            .iter()
            .take(k)
            .enumerate()
            .map(|(idx, passage)| Candidate::new(passage.clone(), idx as f32 * 0.1))
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<Passage>, ApiError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(ApiError::store("connection refused"));
        }
        Ok(self.passages.lock().unwrap().clone())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, ApiError> {
        let mut stored = self.passages.lock().unwrap();
        let before = stored.len();
        stored.retain(|p| !ids.contains(&p.id));
        Ok(before - stored.len())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.passages.lock().unwrap().len())
    }
}

/// What the scripted judge does when a prompt contains a given marker.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Hang,
    /// Replies with the text after sleeping for the given milliseconds.
    Delay(u64, String),
}

/// Judgment model that answers by looking for marker substrings in the prompt.
///
/// Markers are checked in insertion order; prompts with no matching marker
/// get `fallback`.
pub struct ScriptedJudge {
    rules: Vec<(String, Reply)>,
    fallback: Reply,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    pub temperatures: Mutex<Vec<Option<f64>>>,
    /// Prompts in the order their replies were produced.
    pub completed: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    pub fn new(fallback: Reply) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, marker: &str, reply: Reply) -> Self {
        self.rules.push((marker.to_string(), reply));
        self
    }

    pub fn score(self, marker: &str, response: &str) -> Self {
        self.reply(marker, Reply::Text(response.to_string()))
    }

    /// Scores each marker in `markers` with the matching value in `scores`.
    pub fn scores(markers: &[&str], scores: &[&str]) -> Self {
        markers
            .iter()
            .zip(scores)
            .fold(Self::new(Reply::Text("0".to_string())), |judge, (m, s)| {
                judge.score(m, s)
            })
    }
}

#[async_trait]
impl LlmProvider for ScriptedJudge {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.temperatures.lock().unwrap().push(request.temperature);

        let reply = self
            .rules
            .iter()
            .find(|(marker, _)| request.prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());

        let result = match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(ApiError::model("judge unreachable")),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("10".to_string())
            }
            Reply::Delay(millis, text) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(text)
            }
        };
        self.completed.lock().unwrap().push(request.prompt);
        result
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        LetterEmbedder.embed(inputs).await
    }
}
