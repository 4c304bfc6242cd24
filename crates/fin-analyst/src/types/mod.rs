//! Core types for the pipeline

pub mod conversation;
pub mod document;
pub mod response;

pub use conversation::{Role, Turn};
pub use document::{Chunk, Document, FinancialSummary};
pub use response::{Answer, Citation, ScoredChunk};
