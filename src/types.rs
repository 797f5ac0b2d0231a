//! Shared types used across the finchat runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Conversation turns
// ---------------------------------------------------------------------------

/// Author of a turn in the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message unit in the conversation log. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Tool calls the model requested while producing this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    /// Outcomes paired positionally with `tool_calls`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolOutcome>,
}

impl Turn {
    pub fn has_tool_activity(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Call id assigned by the model (synthesised when the model omits one).
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Success value XOR error description for a single tool call.
///
/// Serializes as `{"result": ...}` or `{"error": "..."}`, which is also the
/// payload handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutput {
    Result(serde_json::Value),
    Error(String),
}

/// Outcome of executing one [`ToolInvocation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub call_id: String,
    pub name: String,
    pub output: ToolOutput,
}

impl ToolOutcome {
    pub fn success(invocation: &ToolInvocation, value: serde_json::Value) -> Self {
        Self {
            call_id: invocation.id.clone(),
            name: invocation.name.clone(),
            output: ToolOutput::Result(value),
        }
    }

    pub fn failure(invocation: &ToolInvocation, error: impl Into<String>) -> Self {
        Self {
            call_id: invocation.id.clone(),
            name: invocation.name.clone(),
            output: ToolOutput::Error(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.output, ToolOutput::Result(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.output {
            ToolOutput::Error(e) => Some(e),
            ToolOutput::Result(_) => None,
        }
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        match &self.output {
            ToolOutput::Result(v) => Some(v),
            ToolOutput::Error(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Inference types
// ---------------------------------------------------------------------------

/// A flattened role+text message sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// Token usage from an inference call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}
