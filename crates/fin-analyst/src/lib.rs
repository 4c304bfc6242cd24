//! fin-analyst: chat with a financial PDF
//!
//! Uploaded reports are converted to markdown and page segments, split into
//! overlapping chunks, embedded with Gemini and searched by cosine similarity.
//! Questions are answered by Gemini from the retrieved chunks and the
//! session's chat history.

pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AppConfig;
pub use conversation::{Orchestrator, Session};
pub use error::{Error, LlmError, Result};
pub use types::{Answer, Chunk, Citation, Document, FinancialSummary, ScoredChunk, Turn};
