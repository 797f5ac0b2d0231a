//! Error taxonomy for tool dispatch and orchestration cycles.
//!
//! Tool errors never escape a round: they are folded into that call's
//! [`ToolOutcome`](crate::types::ToolOutcome). Cycle errors abort the whole
//! request and are surfaced to the caller.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    NotFound(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// A required credential is absent. Raised before any network call.
    #[error("{0}")]
    Configuration(String),

    /// The tool ran but failed (provider failure, malformed upstream data).
    #[error("{0}")]
    Execution(String),

    #[error("Tool {tool} timed out after {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },
}

impl ToolError {
    pub fn invalid(tool: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing_key(provider: &str) -> Self {
        Self::Configuration(format!("{provider} API key not configured"))
    }
}

/// Failure that aborts a whole orchestration cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Model request failed: {0:#}")]
    Model(#[source] anyhow::Error),

    #[error("Model request timed out after {}s", .0.as_secs())]
    ModelTimeout(Duration),

    #[error("Model returned an empty reply")]
    EmptyReply,

    /// The follow-up call asked for another tool round; only one is allowed.
    #[error("Model requested further tool calls after the tool round")]
    ChainedToolCalls,

    #[error("Request cancelled")]
    Cancelled,

    #[error("A request is already in flight for this session")]
    Busy,
}
