//! Prompt assembly for answer generation

mod prompt;

pub use prompt::{
    build_context, render_history, PromptFields, PromptTemplate, REQUIRED_PLACEHOLDERS,
};
