//! Model inference over an OpenAI-compatible chat completions API.
//!
//! Supports tool-use (function calling) including the follow-up call that
//! returns tool outcomes keyed by call id.

use super::{ModelClient, ModelReply, ModelRequest, ModelResponse};
use crate::config::{FinchatConfig, Secret};
use crate::types::*;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inference client for `/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    api_key: Secret,
    model: String,
    max_tokens: u32,
    temperature: f64,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload<'a>>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: ChatRole,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl MessagePayload {
    fn text(role: ChatRole, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolPayload<'a> {
    r#type: &'a str,
    function: FunctionPayload<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionPayload<'a> {
    name: &'a str,
    description: &'a str,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallPayload {
    #[serde(default)]
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: FunctionCallPayload,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallPayload>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(base_url: &str, api_key: Secret, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &FinchatConfig) -> Self {
        Self {
            max_tokens: config.max_tokens_per_turn,
            temperature: config.temperature,
            ..Self::new(
                &config.model_api_url,
                config.model_api_key.clone(),
                &config.inference_model,
            )
        }
    }

    fn build_messages(request: &ModelRequest<'_>) -> Result<Vec<MessagePayload>> {
        let mut messages = Vec::with_capacity(request.history.len() + 3);
        messages.push(MessagePayload::text(ChatRole::System, request.system_prompt));
        for m in request.history {
            messages.push(MessagePayload::text(m.role, &m.content));
        }
        messages.push(MessagePayload::text(ChatRole::User, request.user_text));

        if let Some(round) = request.tool_round {
            let calls = round
                .invocations
                .iter()
                .map(|inv| ToolCallPayload {
                    id: inv.id.clone(),
                    r#type: function_type(),
                    function: FunctionCallPayload {
                        name: inv.name.clone(),
                        arguments: inv.arguments.to_string(),
                    },
                })
                .collect();
            messages.push(MessagePayload {
                role: ChatRole::Assistant,
                content: None,
                tool_calls: Some(calls),
                tool_call_id: None,
            });

            for outcome in round.outcomes {
                let content = serde_json::to_string(&outcome.output)
                    .context("Failed to encode tool outcome")?;
                messages.push(MessagePayload {
                    role: ChatRole::Tool,
                    content: Some(content),
                    tool_calls: None,
                    tool_call_id: Some(outcome.call_id.clone()),
                });
            }
        }

        Ok(messages)
    }
}

#[async_trait]
impl ModelClient for InferenceClient {
    /// Run inference with tool support.
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        let api_key = match self.api_key.expose() {
            Some(key) => key,
            None => bail!("Model API key not configured"),
        };
        let url = format!("{}/v1/chat/completions", self.base_url);

        let tools: Option<Vec<ToolPayload>> = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| ToolPayload {
                        r#type: "function",
                        function: FunctionPayload {
                            name: t.name,
                            description: t.description,
                            parameters: t.json_schema(),
                        },
                    })
                    .collect(),
            )
        };

        let body = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(request)?,
            tools,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            "Inference request to model: {} ({} messages, follow-up: {})",
            self.model,
            body.messages.len(),
            request.tool_round.is_some()
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("Inference request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Inference failed ({}): {}", status, body);
        }

        let body: ChatResponse = resp.json().await.context("Failed to parse inference response")?;

        let choice = body.choices.into_iter().next().unwrap_or(Choice {
            message: ResponseMessage {
                content: None,
                tool_calls: Vec::new(),
            },
        });

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();
        debug!("Inference usage: {} tokens", usage.total_tokens);

        // Tool calls win over any accompanying stub text
        let reply = if choice.message.tool_calls.is_empty() {
            ModelReply::Text(choice.message.content.unwrap_or_default())
        } else {
            ModelReply::ToolCalls(
                choice
                    .message
                    .tool_calls
                    .into_iter()
                    .map(|tc| {
                        let arguments = parse_arguments(tc.function.arguments);
                        let id = if tc.id.is_empty() {
                            format!("call_{}", ulid::Ulid::new())
                        } else {
                            tc.id
                        };
                        ToolInvocation {
                            id,
                            name: tc.function.name,
                            arguments,
                        }
                    })
                    .collect(),
            )
        };

        Ok(ModelResponse { reply, usage })
    }
}

/// Decode the model's argument string.
///
/// Blank means no arguments. Unparseable text is kept as a JSON string so
/// schema validation rejects it for that invocation.
fn parse_arguments(raw: String) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Null;
    }
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("Malformed tool arguments: {}", e);
            serde_json::Value::String(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolRound;
    use crate::tools::tool_specs;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(base: &str) -> InferenceClient {
        InferenceClient::new(base, Secret::new("test-key"), "test-model")
    }

    fn request<'a>(history: &'a [ChatMessage], round: Option<ToolRound<'a>>) -> ModelRequest<'a> {
        ModelRequest {
            system_prompt: "system",
            history,
            user_text: "Sum 25 and 37",
            tools: tool_specs(),
            tool_round: round,
        }
    }

    #[tokio::test]
    async fn parses_tool_calls_over_stub_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_includes("\"name\":\"primeNumber\"");
                then.status(200).json_body(json!({
                    "choices": [{"message": {
                        "role": "assistant",
                        "content": "Let me calculate that.",
                        "tool_calls": [
                            {"id": "call_1", "type": "function",
                             "function": {"name": "sum", "arguments": "{\"num1\":25,\"num2\":37}"}},
                            {"type": "function",
                             "function": {"name": "sum", "arguments": "{not json"}}
                        ]
                    }}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
                }));
            })
            .await;

        let resp = client(&server.base_url()).complete(&request(&[], None)).await.unwrap();
        mock.assert_async().await;

        assert_eq!(resp.usage.total_tokens, 20);
        let ModelReply::ToolCalls(calls) = resp.reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].arguments, json!({"num1": 25, "num2": 37}));
        assert!(calls[1].id.starts_with("call_"));
        assert_eq!(calls[1].arguments, json!("{not json"));
    }

    #[test]
    fn truncated_arguments_are_not_treated_as_empty() {
        let raw = r#"{"query": "rust"#.to_string();
        assert_eq!(parse_arguments(raw.clone()), serde_json::Value::String(raw));
        assert_eq!(parse_arguments("  ".into()), serde_json::Value::Null);
        assert_eq!(parse_arguments(r#"{"query":"rust"}"#.into()), json!({"query": "rust"}));
    }

    #[tokio::test]
    async fn follow_up_carries_outcomes_keyed_by_call_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .body_includes("\"tool_call_id\":\"call_1\"")
                    .body_includes("{\\\"result\\\":62}")
                    .body_includes("\"role\":\"tool\"");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "25 + 37 = 62"}}]
                }));
            })
            .await;

        let invocations = vec![ToolInvocation {
            id: "call_1".into(),
            name: "sum".into(),
            arguments: json!({"num1": 25, "num2": 37}),
        }];
        let outcomes = vec![ToolOutcome::success(&invocations[0], json!(62))];
        let history = vec![ChatMessage {
            role: ChatRole::Assistant,
            content: "Hello!".into(),
        }];
        let round = ToolRound {
            invocations: &invocations,
            outcomes: &outcomes,
        };

        let resp = client(&server.base_url())
            .complete(&request(&history, Some(round)))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(resp.reply, ModelReply::Text("25 + 37 = 62".into()));
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(500).body("upstream exploded");
            })
            .await;

        let err = client(&server.base_url())
            .complete(&request(&[], None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let client = InferenceClient::new("http://127.0.0.1:9", Secret::default(), "m");
        let err = client.complete(&request(&[], None)).await.unwrap_err();
        assert_eq!(err.to_string(), "Model API key not configured");
    }
}
