#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use finchat::agent::Orchestrator;
use finchat::config::FinchatConfig;
use finchat::llm::{ModelClient, ModelRequest, ModelResponse};
use finchat::tools::ToolRegistry;
use finchat::types::*;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the model saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub history: Vec<ChatMessage>,
    pub user_text: String,
    pub tool_names: Vec<String>,
    pub round: Option<(Vec<ToolInvocation>, Vec<ToolOutcome>)>,
}

type Respond = dyn Fn(&ModelRequest<'_>) -> Result<ModelResponse> + Send + Sync;

/// Closure-driven model; optionally sleeps before answering.
pub struct FakeModel {
    respond: Box<Respond>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeModel {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&ModelRequest<'_>) -> Result<ModelResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn slow<F>(delay: Duration, respond: F) -> Arc<Self>
    where
        F: Fn(&ModelRequest<'_>) -> Result<ModelResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            delay: Some(delay),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for FakeModel {
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            history: request.history.to_vec(),
            user_text: request.user_text.to_string(),
            tool_names: request.tools.iter().map(|t| t.name.to_string()).collect(),
            round: request
                .tool_round
                .map(|r| (r.invocations.to_vec(), r.outcomes.to_vec())),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(request)
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolInvocation {
    ToolInvocation {
        id: id.into(),
        name: name.into(),
        arguments,
    }
}

/// First call requests `calls`; the follow-up echoes each outcome.
pub fn tools_then_summary(
    calls: Vec<ToolInvocation>,
) -> impl Fn(&ModelRequest<'_>) -> Result<ModelResponse> + Send + Sync + 'static {
    move |request| match request.tool_round {
        None => Ok(ModelResponse::tool_calls(calls.clone())),
        Some(round) => {
            let lines: Vec<String> = round
                .outcomes
                .iter()
                .map(|o| match &o.output {
                    ToolOutput::Result(v) => format!("{}={}", o.name, v),
                    ToolOutput::Error(e) => format!("{} failed: {}", o.name, e),
                })
                .collect();
            Ok(ModelResponse::text(lines.join("; ")))
        }
    }
}

pub fn orchestrator(model: Arc<FakeModel>) -> Orchestrator {
    orchestrator_with_timeout(model, Duration::from_secs(5))
}

pub fn orchestrator_with_timeout(model: Arc<FakeModel>, model_timeout: Duration) -> Orchestrator {
    let registry = Arc::new(ToolRegistry::new(&FinchatConfig::default()));
    Orchestrator::new(model, registry, "You are a test assistant.".into(), model_timeout)
}

pub fn orchestrator_with_registry(model: Arc<FakeModel>, registry: ToolRegistry) -> Orchestrator {
    Orchestrator::new(
        model,
        Arc::new(registry),
        "You are a test assistant.".into(),
        Duration::from_secs(5),
    )
}
