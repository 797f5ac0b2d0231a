//! Message context builder for model calls.
//!
//! Prior turns are resent as role + text only. Tool calls and outcomes of
//! earlier turns survive solely through the assistant text that was
//! synthesised from them.

use crate::types::*;
use tracing::debug;

/// Flatten prior turns into chat messages.
pub fn flatten_history(turns: &[Turn]) -> Vec<ChatMessage> {
    let messages: Vec<ChatMessage> = turns
        .iter()
        .map(|turn| ChatMessage {
            role: turn.role.into(),
            content: turn.content.clone(),
        })
        .collect();

    debug!("History context: {} messages", messages.len());
    messages
}
