use std::sync::Arc;

use serde::Serialize;

use super::history::{ChatMessage, SessionStore, SourceRef};
use super::prompt::build_answer_prompt;
use crate::core::config::AppSettings;
use crate::core::errors::ApiError;
use crate::llm::{GenerateRequest, LlmProvider};
use crate::rag::pipeline::{RetrievalPipeline, RetrievalReport};

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: ChatMessage,
    pub retrieval: RetrievalReport,
}

/// Answers questions in a session from the indexed documents.
pub struct ChatService {
    sessions: SessionStore,
    pipeline: Arc<RetrievalPipeline>,
    llm: Arc<dyn LlmProvider>,
    settings: AppSettings,
}

impl ChatService {
    pub fn new(
        sessions: SessionStore,
        pipeline: Arc<RetrievalPipeline>,
        llm: Arc<dyn LlmProvider>,
        settings: AppSettings,
    ) -> Self {
        Self {
            sessions,
            pipeline,
            llm,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Retrieves supporting passages, asks the answer model and records both
    /// turns. Nothing is recorded when retrieval or generation fails.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<ChatReply, ApiError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApiError::BadRequest("Question must not be empty".to_string()));
        }
        if self.sessions.get_session(session_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("Session not found: {}", session_id)));
        }

        let history = match self.settings.chat.history_turns {
            0 => Vec::new(),
            turns => self.sessions.get_history(session_id, turns as i64).await?,
        };

        let retrieval = self
            .pipeline
            .retrieve_with_report(
                question,
                self.settings.retrieval.top_k_coarse,
                self.settings.retrieval.top_k_final,
            )
            .await?;

        let prompt = build_answer_prompt(question, &retrieval.passages, &history);
        let request = GenerateRequest::new(&self.settings.llm.answer_model, prompt)
            .with_temperature(self.settings.chat.answer_temperature);
        let answer = self.llm.generate(request).await?;

        let sources = retrieval
            .passages
            .iter()
            .map(|p| SourceRef {
                file_name: p.passage.metadata.file_name.clone(),
                title: p.passage.metadata.title.clone(),
                page_num: p.passage.metadata.page_num,
                score: p.score,
            })
            .collect();
        let reply = ChatMessage::assistant(answer.trim(), sources);

        self.sessions
            .add_message(session_id, &ChatMessage::user(question))
            .await?;
        self.sessions.add_message(session_id, &reply).await?;

        tracing::info!(
            "Answered question in session {} with {} sources",
            session_id,
            reply.sources.len()
        );
        Ok(ChatReply {
            message: reply,
            retrieval,
        })
    }
}
