//! LLM provider trait for generating answers

use async_trait::async_trait;

use crate::error::LlmError;

/// Trait for prompt completion
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API (gemini-2.0-flash)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully rendered prompt
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
