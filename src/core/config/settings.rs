//! Typed view over the merged YAML config.
//!
//! Missing or malformed keys fall back to defaults; numeric values are clamped
//! into sane ranges. `validation` rejects bad values before they are saved.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::rag::store::DuplicatePolicy;

#[derive(Debug, Clone, Serialize)]
pub struct LlmSettings {
    /// `ollama` or `lmstudio`.
    pub provider: String,
    pub base_url: String,
    pub judge_model: String,
    pub answer_model: String,
    pub embedding_model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            judge_model: "deepseek-r1:1.5b".to_string(),
            answer_model: "deepseek-r1:1.5b".to_string(),
            embedding_model: "all-minilm".to_string(),
            api_key: None,
            request_timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalSettings {
    pub top_k_coarse: usize,
    pub top_k_final: usize,
    /// Characters of candidate text shown to the judgment model.
    pub judge_excerpt_chars: usize,
    /// Characters of a neighbouring page appended during context completion.
    pub context_excerpt_chars: usize,
    pub judge_temperature: f64,
    pub judge_concurrency: usize,
    pub judge_timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k_coarse: 10,
            top_k_final: 3,
            judge_excerpt_chars: 300,
            context_excerpt_chars: 200,
            judge_temperature: 0.1,
            judge_concurrency: 4,
            judge_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSettings {
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSettings {
    /// Most recent messages folded into the answer prompt.
    pub history_turns: usize,
    pub answer_temperature: f64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_turns: 3,
            answer_temperature: 0.1,
        }
    }
}

/// Browser origins allowed to call the API. Empty means local defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerSettings {
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppSettings {
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub store: StoreSettings,
    pub chat: ChatSettings,
    pub server: ServerSettings,
}

impl AppSettings {
    pub fn from_config(config: &Value) -> Self {
        let defaults = AppSettings::default();

        let llm = config.get("llm");
        let llm = LlmSettings {
            provider: string_field(llm, "provider")
                .map(|p| p.to_ascii_lowercase())
                .unwrap_or(defaults.llm.provider),
            base_url: string_field(llm, "base_url")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm.base_url),
            judge_model: string_field(llm, "judge_model").unwrap_or(defaults.llm.judge_model),
            answer_model: string_field(llm, "answer_model").unwrap_or(defaults.llm.answer_model),
            embedding_model: string_field(llm, "embedding_model")
                .unwrap_or(defaults.llm.embedding_model),
            api_key: string_field(llm, "api_key"),
            request_timeout_secs: u64_field(llm, "request_timeout_secs")
                .unwrap_or(defaults.llm.request_timeout_secs)
                .clamp(1, 3600),
        };

        let retrieval = config.get("retrieval");
        let retrieval = RetrievalSettings {
            top_k_coarse: u64_field(retrieval, "top_k_coarse")
                .map(|v| v as usize)
                .unwrap_or(defaults.retrieval.top_k_coarse)
                .clamp(1, 200),
            top_k_final: u64_field(retrieval, "top_k_final")
                .map(|v| v as usize)
                .unwrap_or(defaults.retrieval.top_k_final)
                .clamp(1, 50),
            judge_excerpt_chars: u64_field(retrieval, "judge_excerpt_chars")
                .map(|v| v as usize)
                .unwrap_or(defaults.retrieval.judge_excerpt_chars)
                .clamp(1, 20_000),
            context_excerpt_chars: u64_field(retrieval, "context_excerpt_chars")
                .map(|v| v as usize)
                .unwrap_or(defaults.retrieval.context_excerpt_chars)
                .clamp(1, 20_000),
            judge_temperature: retrieval
                .and_then(|v| v.get("judge_temperature"))
                .and_then(|v| v.as_f64())
                .unwrap_or(defaults.retrieval.judge_temperature)
                .clamp(0.0, 2.0),
            judge_concurrency: u64_field(retrieval, "judge_concurrency")
                .map(|v| v as usize)
                .unwrap_or(defaults.retrieval.judge_concurrency)
                .clamp(1, 64),
            judge_timeout_secs: u64_field(retrieval, "judge_timeout_secs")
                .unwrap_or(defaults.retrieval.judge_timeout_secs)
                .clamp(1, 3600),
        };

        let store = StoreSettings {
            duplicate_policy: string_field(config.get("store"), "duplicate_policy")
                .and_then(|policy| DuplicatePolicy::parse(&policy))
                .unwrap_or_default(),
        };

        let chat = config.get("chat");
        let chat = ChatSettings {
            history_turns: u64_field(chat, "history_turns")
                .map(|v| v as usize)
                .unwrap_or(defaults.chat.history_turns)
                .min(100),
            answer_temperature: chat
                .and_then(|v| v.get("answer_temperature"))
                .and_then(|v| v.as_f64())
                .unwrap_or(defaults.chat.answer_temperature)
                .clamp(0.0, 2.0),
        };

        let server = ServerSettings {
            cors_allowed_origins: config
                .get("server")
                .and_then(|v| v.get("cors_allowed_origins"))
                .and_then(|v| v.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|item| item.as_str())
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Self {
            llm,
            retrieval,
            store,
            chat,
            server,
        }
    }
}

fn string_field(section: Option<&Value>, key: &str) -> Option<String> {
    section
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn u64_field(section: Option<&Value>, key: &str) -> Option<u64> {
    section.and_then(|v| v.get(key)).and_then(|v| v.as_u64())
}
