//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::LlmError;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API (embedding-001)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a search query
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Embed document chunks (batch)
    ///
    /// Default implementation calls `embed` sequentially.
    /// Implementations should override for better performance.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
