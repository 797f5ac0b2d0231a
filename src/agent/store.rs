//! Append-only conversation log for one session.

use crate::types::*;
use chrono::Utc;
use ulid::{Generator, Ulid};

/// The assistant's answer to one cycle, before it becomes a [`Turn`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub tool_results: Vec<ToolOutcome>,
    pub usage: TokenUsage,
}

/// Ordered log of turns. Turns are only ever appended or cleared wholesale.
pub struct ConversationStore {
    turns: Vec<Turn>,
    ids: Generator,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            ids: Generator::new(),
        }
    }

    /// Monotonic id; falls back to a fresh ULID if the generator overflows
    /// within one millisecond.
    fn next_id(&mut self) -> String {
        self.ids
            .generate()
            .unwrap_or_else(|_| Ulid::new())
            .to_string()
    }

    pub fn append_user(&mut self, text: &str) -> &Turn {
        let turn = Turn {
            id: self.next_id(),
            role: Role::User,
            content: text.to_string(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        };
        self.push(turn)
    }

    pub fn append_assistant(&mut self, reply: AssistantReply) -> &Turn {
        let turn = Turn {
            id: self.next_id(),
            role: Role::Assistant,
            content: reply.text,
            timestamp: Utc::now(),
            tool_calls: reply.tool_calls,
            tool_results: reply.tool_results,
        };
        self.push(turn)
    }

    fn push(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
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

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
