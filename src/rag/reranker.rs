//! LLM-judged relevance reranking.
//!
//! Every coarse candidate is scored 0–10 by a judgment model against the
//! query. Candidates whose judgment fails (transport error, timeout,
//! unparsable reply) are dropped individually; the batch always completes.
//! Survivors scoring at least [`RELEVANCE_THRESHOLD`] are sorted by score,
//! ties keeping coarse order, and truncated to `top_k_final`.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use super::types::{excerpt, Candidate};
use crate::core::config::{LlmSettings, RetrievalSettings};
use crate::llm::{GenerateRequest, LlmProvider};

/// Minimum judged score for a candidate to reach the final set.
pub const RELEVANCE_THRESHOLD: f32 = 6.0;
pub const MAX_SCORE: f32 = 10.0;

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    pub model: String,
    pub excerpt_chars: usize,
    pub temperature: f64,
    /// Judgment calls in flight at once.
    pub concurrency: usize,
    pub call_timeout: Duration,
}

impl RerankerConfig {
    pub fn from_settings(llm: &LlmSettings, retrieval: &RetrievalSettings) -> Self {
        Self {
            model: llm.judge_model.clone(),
            excerpt_chars: retrieval.judge_excerpt_chars,
            temperature: retrieval.judge_temperature,
            concurrency: retrieval.judge_concurrency,
            call_timeout: Duration::from_secs(retrieval.judge_timeout_secs),
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default(), &RetrievalSettings::default())
    }
}

/// Why a candidate left the ranked pool without a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DropReason {
    ModelError(String),
    Timeout,
    Unparsable(String),
    OutOfRange(f32),
}

/// Outcome of judging a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Judgment {
    Scored(f32),
    Dropped(DropReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedCandidate {
    pub passage_id: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RerankReport {
    /// Finalists with `score` set, highest first.
    pub ranked: Vec<Candidate>,
    pub dropped: Vec<DroppedCandidate>,
    /// Candidates that were scored but fell under the threshold.
    pub below_threshold: usize,
}

pub struct RelevanceReranker {
    judge: Arc<dyn LlmProvider>,
    config: RerankerConfig,
}

impl RelevanceReranker {
    pub fn new(judge: Arc<dyn LlmProvider>, config: RerankerConfig) -> Self {
        Self { judge, config }
    }

    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k_final: usize,
    ) -> RerankReport {
        if candidates.is_empty() {
            return RerankReport::default();
        }

        // `buffered` yields in input order, so judgments line up with candidates
        let judgments: Vec<Judgment> = stream::iter(candidates.iter())
            .map(|candidate| self.judge_one(query, candidate))
            .buffered(self.config.concurrency.max(1))
            .boxed()
            .collect()
            .await;

        let mut report = RerankReport::default();
        for (mut candidate, judgment) in candidates.into_iter().zip(judgments) {
            match judgment {
                Judgment::Scored(score) if score >= RELEVANCE_THRESHOLD => {
                    candidate.score = Some(score);
                    report.ranked.push(candidate);
                }
                Judgment::Scored(score) => {
                    tracing::debug!(
                        "Candidate {} scored {:.1}, below threshold",
                        candidate.passage.id,
                        score
                    );
                    report.below_threshold += 1;
                }
                Judgment::Dropped(reason) => {
                    tracing::warn!(
                        "Dropping candidate {} from rerank: {:?}",
                        candidate.passage.id,
                        reason
                    );
                    report.dropped.push(DroppedCandidate {
                        passage_id: candidate.passage.id,
                        reason,
                    });
                }
            }
        }

        report
            .ranked
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        report.ranked.truncate(top_k_final);

        tracing::info!(
            "Rerank kept {} (dropped {}, below threshold {})",
            report.ranked.len(),
            report.dropped.len(),
            report.below_threshold
        );
        report
    }

    async fn judge_one(&self, query: &str, candidate: &Candidate) -> Judgment {
        let prompt = judgment_prompt(query, &candidate.passage.text, self.config.excerpt_chars);
        let request =
            GenerateRequest::new(&self.config.model, prompt).with_temperature(self.config.temperature);

        let response =
            match tokio::time::timeout(self.config.call_timeout, self.judge.generate(request)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return Judgment::Dropped(DropReason::ModelError(err.to_string())),
                Err(_) => return Judgment::Dropped(DropReason::Timeout),
            };

        match parse_score(&response) {
            Ok(score) => {
                tracing::debug!("Candidate {} judged {:.1}", candidate.passage.id, score);
                Judgment::Scored(score)
            }
            Err(reason) => Judgment::Dropped(reason),
        }
    }
}

pub fn judgment_prompt(query: &str, text: &str, excerpt_chars: usize) -> String {
    format!(
        "Judge how relevant the following document excerpt is to the user's question. \
Reply with only a relevance score from 0 to 10 (higher means more relevant) and nothing else.\n\
User question: {}\n\
Document excerpt: {}...\n\
Relevance score:",
        query,
        excerpt(text, excerpt_chars)
    )
}

/// Parses a judgment reply into a score in `[0, MAX_SCORE]`.
///
/// A leading `<think>…</think>` block emitted by reasoning models is
/// ignored; everything else must be a bare number.
pub fn parse_score(response: &str) -> Result<f32, DropReason> {
    let answer = match response.rfind("</think>") {
        Some(idx) => &response[idx + "</think>".len()..],
        None => response,
    };
    let trimmed = answer.trim();

    let score: f32 = trimmed
        .parse()
        .map_err(|_| DropReason::Unparsable(excerpt(trimmed, 80).to_string()))?;
    if !score.is_finite() {
        return Err(DropReason::Unparsable(trimmed.to_string()));
    }
    if !(0.0..=MAX_SCORE).contains(&score) {
        return Err(DropReason::OutOfRange(score));
    }
    Ok(score)
}
