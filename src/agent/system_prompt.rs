//! System instruction sent with every model call.
//!
//! Layers (in order):
//! 1. Name and role
//! 2. Available tools (rendered from the registry specs)
//! 3. Usage guidance
//! 4. Operator persona (optional, from config)

use crate::config::FinchatConfig;
use crate::tools::ToolSpec;
use tracing::debug;

const ROLE: &str = "an AI assistant with access to powerful tools for financial \
analysis, calculations, and data retrieval.";

const GUIDANCE: &str = "Use these tools when appropriate based on user requests. \
For general questions, provide direct answers. Be helpful, informative, and professional. \
When a tool reports an error, explain what went wrong and answer as well as you can \
without it.";

/// Build the complete system prompt.
pub fn build_system_prompt(config: &FinchatConfig, tools: &[ToolSpec]) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(&format!("You are {}, {}", config.name, ROLE));
    prompt.push_str("\n\nAvailable tools:\n");
    for tool in tools {
        prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }

    prompt.push('\n');
    prompt.push_str(GUIDANCE);
    prompt.push('\n');

    let persona = config.persona.trim();
    if !persona.is_empty() {
        prompt.push_str("\n# Operator Instructions\n\n");
        prompt.push_str(persona);
        prompt.push('\n');
    }

    debug!("System prompt: {} chars", prompt.len());
    prompt
}
