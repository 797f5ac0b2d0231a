//! One orchestration cycle: user input → model → tools → model → reply.
//!
//! The cycle is a small state machine:
//!
//! ```text
//! AwaitingFirstResponse ─┬─> DirectAnswer ───────────────────────────────┬─> Done
//!                        └─> AwaitingToolOutcomes ─> AwaitingSecondResponse ┘
//! ```
//!
//! Cancellation is checked on every transition. Tool calls of a round run
//! concurrently, each in its own task, and are reassembled in request order.

use crate::agent::context;
use crate::agent::store::{AssistantReply, ConversationStore};
use crate::agent::system_prompt;
use crate::config::FinchatConfig;
use crate::error::CycleError;
use crate::llm::{ModelClient, ModelReply, ModelRequest, ModelResponse, ToolRound};
use crate::tools::ToolRegistry;
use crate::types::*;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    AwaitingFirstResponse,
    DirectAnswer,
    AwaitingToolOutcomes,
    AwaitingSecondResponse,
    Done,
}

impl CyclePhase {
    pub fn can_advance_to(self, next: CyclePhase) -> bool {
        use CyclePhase::*;
        matches!(
            (self, next),
            (AwaitingFirstResponse, DirectAnswer)
                | (AwaitingFirstResponse, AwaitingToolOutcomes)
                | (AwaitingToolOutcomes, AwaitingSecondResponse)
                | (DirectAnswer, Done)
                | (AwaitingSecondResponse, Done)
        )
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingFirstResponse => write!(f, "awaiting_first_response"),
            Self::DirectAnswer => write!(f, "direct_answer"),
            Self::AwaitingToolOutcomes => write!(f, "awaiting_tool_outcomes"),
            Self::AwaitingSecondResponse => write!(f, "awaiting_second_response"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Aborts any still-running tool tasks when dropped.
struct ToolTasks(Vec<JoinHandle<ToolOutcome>>);

impl Drop for ToolTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Drives request cycles against a model and the tool registry.
pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    system_prompt: String,
    model_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        system_prompt: String,
        model_timeout: Duration,
    ) -> Self {
        Self {
            model,
            registry,
            system_prompt,
            model_timeout,
        }
    }

    pub fn from_config(
        config: &FinchatConfig,
        model: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let prompt = system_prompt::build_system_prompt(config, registry.specs());
        Self::new(model, registry, prompt, config.model_timeout())
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run a full cycle against `store`.
    ///
    /// Blank input is ignored (`Ok(None)`, store untouched). Otherwise the
    /// user turn is appended first and stays even if the cycle aborts; the
    /// assistant turn is appended only on success.
    pub async fn handle(
        &self,
        store: &mut ConversationStore,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Turn>, CycleError> {
        if input.trim().is_empty() {
            debug!("Ignoring empty input");
            return Ok(None);
        }

        store.append_user(input);
        let prior = store.len() - 1;
        let reply = self.run_cycle(&store.turns()[..prior], input, cancel).await?;

        if cancel.is_cancelled() {
            return Err(CycleError::Cancelled);
        }
        Ok(Some(store.append_assistant(reply).clone()))
    }

    /// Produce the assistant reply for `user_text` given the turns before it.
    ///
    /// Does not touch any store; callers append the result.
    pub async fn run_cycle(
        &self,
        prior: &[Turn],
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<AssistantReply, CycleError> {
        info!("Cycle started ({} prior turns)", prior.len());

        let history = context::flatten_history(prior);
        let mut usage = TokenUsage::default();
        let mut phase = CyclePhase::AwaitingFirstResponse;
        check_cancel(cancel)?;

        let first_request = ModelRequest {
            system_prompt: &self.system_prompt,
            history: &history,
            user_text,
            tools: self.registry.specs(),
            tool_round: None,
        };
        let first = self.call_model(&first_request, cancel).await?;
        usage.add(&first.usage);

        let invocations = match first.reply {
            ModelReply::ToolCalls(calls) if !calls.is_empty() => calls,
            ModelReply::ToolCalls(_) => return Err(CycleError::EmptyReply),
            ModelReply::Text(text) => {
                phase = advance(phase, CyclePhase::DirectAnswer, cancel)?;
                let text = non_empty(text)?;
                advance(phase, CyclePhase::Done, cancel)?;
                info!("Cycle complete: direct answer, {} tokens", usage.total_tokens);
                return Ok(AssistantReply {
                    text,
                    tool_calls: Vec::new(),
                    tool_results: Vec::new(),
                    usage,
                });
            }
        };

        phase = advance(phase, CyclePhase::AwaitingToolOutcomes, cancel)?;
        info!("Model requested {} tool call(s)", invocations.len());
        let outcomes = self.dispatch_all(&invocations, cancel).await?;
        debug_assert_eq!(outcomes.len(), invocations.len());

        phase = advance(phase, CyclePhase::AwaitingSecondResponse, cancel)?;
        let second_request = ModelRequest {
            tool_round: Some(ToolRound {
                invocations: &invocations,
                outcomes: &outcomes,
            }),
            ..first_request
        };
        let second = self.call_model(&second_request, cancel).await?;
        usage.add(&second.usage);

        let text = match second.reply {
            ModelReply::Text(text) => non_empty(text)?,
            ModelReply::ToolCalls(_) => return Err(CycleError::ChainedToolCalls),
        };
        advance(phase, CyclePhase::Done, cancel)?;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Cycle complete: {} tool call(s), {} failed, {} tokens",
            invocations.len(),
            failed,
            usage.total_tokens
        );

        Ok(AssistantReply {
            text,
            tool_calls: invocations,
            tool_results: outcomes,
            usage,
        })
    }

    /// One model call, bounded by the model timeout and the cancel token.
    async fn call_model(
        &self,
        request: &ModelRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, CycleError> {
        let call = tokio::time::timeout(self.model_timeout, self.model.complete(request));
        tokio::select! {
            _ = cancel.cancelled() => Err(CycleError::Cancelled),
            result = call => match result {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => {
                    error!("Model call failed: {:#}", e);
                    Err(CycleError::Model(e))
                }
                Err(_) => {
                    error!("Model call timed out after {:?}", self.model_timeout);
                    Err(CycleError::ModelTimeout(self.model_timeout))
                }
            },
        }
    }

    /// Execute every invocation concurrently; outcomes keep request order.
    async fn dispatch_all(
        &self,
        invocations: &[ToolInvocation],
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolOutcome>, CycleError> {
        let mut tasks = ToolTasks(
            invocations
                .iter()
                .cloned()
                .map(|invocation| {
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move { registry.execute(&invocation).await })
                })
                .collect(),
        );

        let mut outcomes = Vec::with_capacity(invocations.len());
        for (i, invocation) in invocations.iter().enumerate() {
            let joined = tokio::select! {
                _ = cancel.cancelled() => None,
                joined = &mut tasks.0[i] => Some(joined),
            };
            let Some(joined) = joined else {
                debug!("Tool round cancelled with {} call(s) pending", invocations.len() - i);
                return Err(CycleError::Cancelled);
            };

            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Tool {} task failed: {}", invocation.name, e);
                    ToolOutcome::failure(invocation, format!("Tool {} crashed", invocation.name))
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), CycleError> {
    if cancel.is_cancelled() {
        Err(CycleError::Cancelled)
    } else {
        Ok(())
    }
}

fn advance(
    from: CyclePhase,
    to: CyclePhase,
    cancel: &CancellationToken,
) -> Result<CyclePhase, CycleError> {
    debug_assert!(from.can_advance_to(to), "illegal transition {from} -> {to}");
    check_cancel(cancel)?;
    debug!("Cycle phase: {} -> {}", from, to);
    Ok(to)
}

fn non_empty(text: String) -> Result<String, CycleError> {
    if text.trim().is_empty() {
        Err(CycleError::EmptyReply)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        use CyclePhase::*;
        assert!(AwaitingFirstResponse.can_advance_to(DirectAnswer));
        assert!(AwaitingFirstResponse.can_advance_to(AwaitingToolOutcomes));
        assert!(AwaitingToolOutcomes.can_advance_to(AwaitingSecondResponse));
        assert!(AwaitingSecondResponse.can_advance_to(Done));
        assert!(DirectAnswer.can_advance_to(Done));

        assert!(!AwaitingFirstResponse.can_advance_to(Done));
        assert!(!DirectAnswer.can_advance_to(AwaitingToolOutcomes));
        assert!(!Done.can_advance_to(AwaitingFirstResponse));
        assert!(!AwaitingToolOutcomes.can_advance_to(Done));
    }

    #[test]
    fn advance_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        let next = advance(CyclePhase::AwaitingFirstResponse, CyclePhase::DirectAnswer, &cancel);
        assert_eq!(next.unwrap(), CyclePhase::DirectAnswer);

        cancel.cancel();
        let next = advance(CyclePhase::DirectAnswer, CyclePhase::Done, &cancel);
        assert!(matches!(next, Err(CycleError::Cancelled)));
    }

    #[test]
    fn blank_text_is_an_empty_reply() {
        assert!(matches!(non_empty("  \n".into()), Err(CycleError::EmptyReply)));
        assert_eq!(non_empty("62".into()).unwrap(), "62");
    }
}
