//! LLM and embedding providers

mod embedding;
mod factory;
mod gemini;
mod llm;
mod retry;

pub use embedding::EmbeddingProvider;
pub use factory::{GeminiProviders, ProviderFactory};
pub use gemini::GeminiClient;
pub use llm::LlmProvider;
pub use retry::{retry_transient, RetryPolicy};
