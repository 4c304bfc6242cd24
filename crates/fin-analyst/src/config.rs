//! Configuration for the financial analyst service

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable holding the default Gemini API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Gemini configuration
    pub llm: LlmConfig,
    /// PDF extraction configuration
    pub extraction: ExtractionConfig,
    /// Prompt and chat presentation
    pub prompt: PromptConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("invalid config file: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(host) = std::env::var("FIN_ANALYST_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("FIN_ANALYST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.server.port = port;
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be at least 1"));
        }
        if self.retrieval.embed_batch_size == 0 {
            return Err(Error::config("retrieval.embed_batch_size must be at least 1"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be at least 1"));
        }
        if self.extraction.timeout_secs == 0 {
            return Err(Error::config("extraction.timeout_secs must be at least 1"));
        }
        if self.server.session_ttl_secs == 0 {
            return Err(Error::config("server.session_ttl_secs must be at least 1"));
        }
        if self.server.max_sessions == 0 {
            return Err(Error::config("server.max_sessions must be at least 1"));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
    /// Idle time after which a session and its index are dropped
    pub session_ttl_secs: u64,
    /// Upper bound on live sessions
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
            session_ttl_secs: 3600,
            max_sessions: 1000,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 400,
        }
    }
}

impl ChunkingConfig {
    /// Overlap must leave a positive window step
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be at least 1"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Texts per embedding request while indexing
    pub embed_batch_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            embed_batch_size: 32,
        }
    }
}

/// Gemini configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Generative Language API base URL
    pub base_url: String,
    /// Default API key; sessions may supply their own
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Generation model name
    pub generate_model: String,
    /// Embedding model name
    pub embed_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Output token limit
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient failures (rate limit, network, timeout)
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds
    pub retry_base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            generate_model: "gemini-2.0-flash".to_string(),
            embed_model: "models/embedding-001".to_string(),
            temperature: 0.1,
            max_output_tokens: 2048,
            timeout_secs: 120,
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

/// PDF extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Upper bound for converting one upload
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Language the analyst answers in
    pub response_language: String,
    /// Custom template with `{context}`, `{chat_history}` and `{question}` placeholders
    pub template: Option<String>,
    /// Suggested questions offered to the user
    pub sample_questions: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            response_language: "Indonesian".to_string(),
            template: None,
            sample_questions: vec![
                "How did the company perform financially this year?".to_string(),
                "What is the company's profitability level?".to_string(),
                "Analyze the company's liquidity ratios".to_string(),
                "What investment recommendation follows from this report?".to_string(),
                "Compare performance with the previous year".to_string(),
            ],
        }
    }
}
