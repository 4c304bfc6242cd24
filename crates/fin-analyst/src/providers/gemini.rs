//! Gemini client for answer generation and embeddings via the Generative Language API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;
use super::retry::{retry_transient, RetryPolicy};
use crate::config::LlmConfig;
use crate::error::{Error, LlmError, Result};

const PROVIDER: &str = "gemini";

/// Gemini client authenticated with an API key
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    generate_model: String,
    embed_model: String,
    temperature: f32,
    max_output_tokens: u32,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("generate_model", &self.generate_model)
            .field("embed_model", &self.embed_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Arguments
    /// * `config` - Model names, timeouts and retry settings
    /// * `api_key` - Google AI Studio API key
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::config("Gemini API key must not be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generate_model: config.generate_model.clone(),
            embed_model: model_path(&config.embed_model),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout_secs: config.timeout_secs,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Get the API endpoint URL for a model method
    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model_path(model), method)
    }

    /// Build the generateContent request body
    fn generate_request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    /// Build the batchEmbedContents request body
    fn embed_request(&self, texts: &[String], task_type: &'static str) -> BatchEmbedRequest {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: self.embed_model.clone(),
                    content: Content {
                        role: None,
                        parts: vec![Part { text: text.clone() }],
                    },
                    task_type,
                })
                .collect(),
        }
    }

    /// POST a JSON body, retrying transient failures, and decode the response
    async fn post_json<B, R>(&self, url: &str, body: &B) -> std::result::Result<R, LlmError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        retry_transient(PROVIDER, &self.retry, || async move {
            let response = self
                .client
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send()
                .await
                .map_err(|e| LlmError::from_transport(e, self.timeout_secs))?;

            let status = response.status();
            if !status.is_success() {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::from_status(
                    PROVIDER,
                    status.as_u16(),
                    body,
                    retry_after,
                ));
            }

            response
                .json::<R>()
                .await
                .map_err(|e| LlmError::Parse(e.to_string()))
        })
        .await
    }
}

/// Prefix bare model names with `models/`
fn model_path(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        let url = self.endpoint(&self.generate_model, "generateContent");
        let request = self.generate_request(prompt);

        tracing::debug!(
            "Gemini request to model={} ({} prompt chars)",
            self.generate_model,
            prompt.len()
        );

        let response: GenerateResponse = self.post_json(&url, &request).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.generate_model
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, LlmError> {
        let url = self.endpoint(&self.embed_model, "batchEmbedContents");
        let request = self.embed_request(&[text.to_string()], "RETRIEVAL_QUERY");

        let response: BatchEmbedResponse = self.post_json(&url, &request).await?;
        response
            .embeddings
            .into_iter()
            .next()
            .map(|e| e.values)
            .ok_or(LlmError::EmptyResponse { provider: PROVIDER })
    }

    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&self.embed_model, "batchEmbedContents");
        let request = self.embed_request(texts, "RETRIEVAL_DOCUMENT");

        let response: BatchEmbedResponse = self.post_json(&url, &request).await?;
        if response.embeddings.len() != texts.len() {
            return Err(LlmError::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
