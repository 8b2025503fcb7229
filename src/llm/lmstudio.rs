use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::GenerateRequest;
use crate::core::errors::ApiError;

/// Talks to the OpenAI-compatible server LM Studio exposes under `/v1`.
/// The prompt is sent as a single user message.
#[derive(Clone)]
pub struct LmStudioProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl LmStudioProvider {
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Response, ApiError> {
        let res = self
            .authorized(self.client.post(self.endpoint(path)))
            .json(body)
            .send()
            .await
            .map_err(ApiError::model)?;
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        Err(ApiError::ModelUnavailable(format!(
            "LM Studio {} error ({}): {}",
            path, status, text
        )))
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

pub(crate) fn completion_body(request: &GenerateRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": [{ "role": "user", "content": request.prompt }],
        "stream": false,
    });
    if let (Some(obj), Some(t)) = (body.as_object_mut(), request.temperature) {
        obj.insert("temperature".to_string(), json!(t));
    }
    body
}

/// Vectors sorted by the server-reported `index`.
fn into_vectors(response: EmbeddingResponse) -> Vec<Vec<f32>> {
    let mut items = response.data;
    items.sort_by_key(|item| item.index);
    items.into_iter().map(|item| item.embedding).collect()
}

#[async_trait]
impl LlmProvider for LmStudioProvider {
    fn name(&self) -> &str {
        "lmstudio"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        match self
            .authorized(self.client.get(self.endpoint("models")))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ApiError> {
        let res = self
            .post("chat/completions", &completion_body(&request))
            .await?;
        let payload: CompletionResponse = res.json().await.map_err(ApiError::model)?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ApiError::ModelUnavailable("LM Studio returned no completion".to_string())
            })
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let body = json!({ "model": model_id, "input": inputs });
        let res = self.post("embeddings", &body).await?;
        let payload: EmbeddingResponse = res.json().await.map_err(ApiError::model)?;
        Ok(into_vectors(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_body_wraps_prompt_as_user_message() {
        let request = GenerateRequest::new("qwen2.5-7b", "score this").with_temperature(0.1);
        let body = completion_body(&request);

        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "score this");
        assert_eq!(body["temperature"], 0.1);
        assert!(completion_body(&GenerateRequest::new("m", "p")).get("temperature").is_none());
    }

    #[test]
    fn embeddings_follow_reported_index() {
        let payload: EmbeddingResponse = serde_json::from_value(json!({
            "data": [
                { "index": 1, "embedding": [0.25, -1.0] },
                { "index": 0, "embedding": [0.5, 1.0] }
            ]
        }))
        .unwrap();
        assert_eq!(into_vectors(payload), vec![vec![0.5, 1.0], vec![0.25, -1.0]]);
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let provider =
            LmStudioProvider::new("http://localhost:1234/".to_string(), None, Duration::from_secs(5))
                .unwrap();
        assert_eq!(provider.endpoint("models"), "http://localhost:1234/v1/models");
    }
}
