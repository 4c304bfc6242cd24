//! Builds providers for a caller-supplied API key

use std::sync::Arc;

use super::embedding::EmbeddingProvider;
use super::gemini::GeminiClient;
use super::llm::LlmProvider;
use crate::config::LlmConfig;
use crate::error::Result;

/// Creates embedding and LLM providers bound to one credential
pub trait ProviderFactory: Send + Sync {
    fn embedder(&self, api_key: &str) -> Result<Arc<dyn EmbeddingProvider>>;

    fn llm(&self, api_key: &str) -> Result<Arc<dyn LlmProvider>>;

    /// Generation model name, for display
    fn generate_model(&self) -> &str;

    /// Embedding model name, for display
    fn embed_model(&self) -> &str;
}

/// Factory producing [`GeminiClient`]s
#[derive(Debug, Clone)]
pub struct GeminiProviders {
    config: LlmConfig,
}

impl GeminiProviders {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl ProviderFactory for GeminiProviders {
    fn embedder(&self, api_key: &str) -> Result<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::new(GeminiClient::new(&self.config, api_key)?))
    }

    fn llm(&self, api_key: &str) -> Result<Arc<dyn LlmProvider>> {
        Ok(Arc::new(GeminiClient::new(&self.config, api_key)?))
    }

    fn generate_model(&self) -> &str {
        &self.config.generate_model
    }

    fn embed_model(&self) -> &str {
        &self.config.embed_model
    }
}
