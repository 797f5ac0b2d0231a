//! Model service boundary.
//!
//! A cycle makes at most two calls: the first with the conversation and the
//! advertised tools, the second (only when tools were requested) with the
//! same context plus the tool-call/outcome pairing for that round.

pub mod inference;

pub use inference::InferenceClient;

use crate::tools::ToolSpec;
use crate::types::{ChatMessage, TokenUsage, ToolInvocation, ToolOutcome};
use anyhow::Result;
use async_trait::async_trait;

/// The tool calls of the current round and their positional outcomes.
#[derive(Debug, Clone, Copy)]
pub struct ToolRound<'a> {
    pub invocations: &'a [ToolInvocation],
    pub outcomes: &'a [ToolOutcome],
}

/// Everything the model sees for one call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system_prompt: &'a str,
    /// Prior turns flattened to role + text.
    pub history: &'a [ChatMessage],
    pub user_text: &'a str,
    pub tools: &'a [ToolSpec],
    /// Present on the second call of a round.
    pub tool_round: Option<ToolRound<'a>>,
}

/// Text XOR tool calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCalls(Vec<ToolInvocation>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub reply: ModelReply,
    pub usage: TokenUsage,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            reply: ModelReply::Text(text.into()),
            usage: TokenUsage::default(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolInvocation>) -> Self {
        Self {
            reply: ModelReply::ToolCalls(calls),
            usage: TokenUsage::default(),
        }
    }
}

/// A chat model that can request tool calls.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse>;
}
