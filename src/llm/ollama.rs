use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::provider::LlmProvider;
use super::types::GenerateRequest;
use crate::core::errors::ApiError;

/// Talks to an Ollama server (`/api/generate`, `/api/embed`).
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OllamaProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub(crate) fn generate_body(request: &GenerateRequest) -> Value {
    let mut options = Map::new();
    if let Some(t) = request.temperature {
        options.insert("temperature".to_string(), json!(t));
    }

    json!({
        "model": request.model,
        "prompt": request.prompt,
        "stream": false,
        "options": Value::Object(options),
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.authorized(self.client.get(&url)).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ApiError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = generate_body(&request);

        let res = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::model)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::ModelUnavailable(format!(
                "Ollama generate error ({}): {}",
                status, text
            )));
        }

        let payload: GenerateResponse = res.json().await.map_err(ApiError::model)?;
        Ok(payload.response)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::model)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::ModelUnavailable(format!(
                "Ollama embed error ({}): {}",
                status, text
            )));
        }

        let payload: EmbedResponse = res.json().await.map_err(ApiError::model)?;
        Ok(payload.embeddings)
    }
}
