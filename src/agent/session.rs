//! Interactive session: one conversation, at most one cycle in flight.
//!
//! State lives behind a plain mutex that is never held across an await; the
//! cycle itself runs unlocked against a snapshot of the prior turns. Clearing
//! the session cancels any in-flight cycle and bumps the epoch, so a late
//! result can never land in the fresh conversation.

use crate::agent::orchestrator::Orchestrator;
use crate::agent::store::ConversationStore;
use crate::error::CycleError;
use crate::types::{TokenUsage, Turn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct SessionState {
    store: ConversationStore,
    loading: bool,
    error: Option<String>,
    usage: TokenUsage,
    cancel: CancellationToken,
    epoch: u64,
}

pub struct Session {
    orchestrator: Arc<Orchestrator>,
    state: Mutex<SessionState>,
}

/// Resets the loading flag if a `send_message` future is dropped mid-cycle.
struct InFlight<'a> {
    session: &'a Session,
    epoch: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.session.lock();
        if state.epoch == self.epoch {
            state.loading = false;
        }
    }
}

impl Session {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            state: Mutex::new(SessionState {
                store: ConversationStore::new(),
                loading: false,
                error: None,
                usage: TokenUsage::default(),
                cancel: CancellationToken::new(),
                epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Submit one user message and wait for the assistant turn.
    ///
    /// Blank input returns `Ok(None)` and changes nothing. While a cycle is
    /// in flight further calls fail with [`CycleError::Busy`].
    pub async fn send_message(&self, text: &str) -> Result<Option<Turn>, CycleError> {
        if text.trim().is_empty() {
            debug!("Ignoring empty message");
            return Ok(None);
        }

        let (prior, cancel, epoch) = {
            let mut state = self.lock();
            if state.loading {
                warn!("Rejected message: cycle already in flight");
                return Err(CycleError::Busy);
            }
            state.loading = true;
            state.error = None;
            let prior = state.store.turns().to_vec();
            state.store.append_user(text);
            (prior, state.cancel.child_token(), state.epoch)
        };
        let _in_flight = InFlight {
            session: self,
            epoch,
        };

        let result = self.orchestrator.run_cycle(&prior, text, &cancel).await;

        let mut state = self.lock();
        if cancel.is_cancelled() || state.epoch != epoch {
            debug!("Discarding result of a cancelled cycle");
            return Err(CycleError::Cancelled);
        }
        state.loading = false;

        match result {
            Ok(reply) => {
                state.usage.add(&reply.usage);
                Ok(Some(state.store.append_assistant(reply).clone()))
            }
            Err(e) => {
                error!("Cycle aborted: {}", e);
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Cancel any in-flight cycle and start an empty conversation.
    pub fn clear_session(&self) {
        let mut state = self.lock();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.epoch = state.epoch.wrapping_add(1);
        state.store.clear();
        state.loading = false;
        state.error = None;
        state.usage = TokenUsage::default();
        info!("Session cleared");
    }

    pub fn history(&self) -> Vec<Turn> {
        self.lock().store.turns().to_vec()
    }

    pub fn turn_count(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Message of the last aborted cycle, cleared by the next send.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Tokens spent since the session was created or last cleared.
    pub fn usage(&self) -> TokenUsage {
        self.lock().usage
    }
}
