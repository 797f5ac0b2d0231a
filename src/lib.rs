//! Finchat — tool-augmented chat assistant for financial questions.
//!
//! Each user message runs one orchestration cycle: the model either answers
//! directly or requests tool calls, the tools run concurrently, and a second
//! model call turns their outcomes into the final reply.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod setup;
pub mod tools;
pub mod types;
