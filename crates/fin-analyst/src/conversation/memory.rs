//! Append-only conversation memory

use serde::Serialize;

use crate::types::Turn;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_push_and_clear() {
        let mut memory = ConversationMemory::new();
        memory.push(Turn::user("Total equity?"));
        memory.push(Turn::assistant("Rp 4.2T"));

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.turns()[0].role, Role::User);
        assert_eq!(memory.turns()[1].role, Role::Assistant);

        memory.clear();
        assert!(memory.is_empty());
    }
}
