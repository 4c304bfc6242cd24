//! Sessions, chat memory and the question-answering loop

mod memory;
mod orchestrator;
mod session;

pub use memory::ConversationMemory;
pub use orchestrator::Orchestrator;
pub use session::{ReadyState, Session, SessionState};
