//! Adapter for the OpenAI Chat Completions wire format (and any
//! OpenAI-compatible server: LM Studio, Ollama, llama.cpp, vLLM).
//!
//! The SSE parsing and tool-call-delta aggregation here generalize a
//! single-provider streaming client to the shared multi-block
//! [`BlockAccumulator`] model.

use super::{BlockAccumulator, ContentBlockStream, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition};
use crate::content_block::{ContentBlock, Message, MessageRole};
use crate::{Error, Result};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

/// Wire message shape for the OpenAI Chat Completions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChunk {
    pub choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChoice {
    pub delta: WireDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireDelta {
    pub content: Option<String>,
    /// Non-standard but widely emitted by reasoning-capable OpenAI-compatible
    /// servers.
    #[serde(alias = "reasoning_content")]
    pub reasoning: Option<String>,
    pub tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    pub function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

fn reasoning_effort_param(effort: ReasoningEffort) -> Option<&'static str> {
    match effort {
        ReasoningEffort::Off => None,
        ReasoningEffort::Minimal => Some("minimal"),
        ReasoningEffort::Low => Some("low"),
        ReasoningEffort::Medium => Some("medium"),
        ReasoningEffort::High => Some("high"),
    }
}

fn message_to_wire(message: &Message) -> WireMessage {
    let role = match message.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut tool_call_id = None;

    for block in &message.content {
        match block {
            ContentBlock::Text(t) => text.push_str(&t.text),
            // No replay signature exists in this wire format; reasoning is
            // dropped rather than folded into the visible message.
            ContentBlock::Reasoning(_) => {}
            ContentBlock::ToolCall(call) => tool_calls.push(WireToolCall {
                id: call.id.clone(),
                call_type: "function".to_string(),
                function: WireFunction {
                    name: call.name.clone(),
                    arguments: serde_json::Value::Object(call.args.clone()).to_string(),
                },
            }),
            ContentBlock::ToolOutput(output) => {
                tool_call_id = Some(output.call_id.clone());
                text.push_str(&output.content);
            }
            ContentBlock::Image(_) => {
                // Multimodal content for this wire format is carried via
                // content parts; the completions adapter is text-primary
                // and drops images it cannot express.
            }
        }
    }

    WireMessage {
        role: role.to_string(),
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        tool_call_id,
    }
}

/// Parses an HTTP streaming response body as OpenAI-style SSE, yielding
/// parsed chunks.
pub(crate) fn parse_sse(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<WireChunk>> + Send>> {
    let stream = response.bytes_stream().filter_map(move |result| async move {
        let bytes = match result.map_err(Error::Http) {
            Ok(b) => b,
            Err(e) => return Some(Err(e)),
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        for line in text.lines() {
            if let Some(data) = line.strip_prefix("data: ") {
                if data == "[DONE]" {
                    continue;
                }
                return Some(
                    serde_json::from_str::<WireChunk>(data)
                        .map_err(|e| Error::malformed_response(format!("bad SSE chunk: {e}"))),
                );
            }
        }
        None
    });
    Box::pin(stream)
}

/// Adapter for the OpenAI Chat Completions wire format.
pub struct OpenAiCompletionAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    tools: Vec<ToolDefinition>,
    timeout: Duration,
    runtime: Runtime,
}

impl OpenAiCompletionAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            tools: Vec::new(),
            timeout: Duration::from_secs(60),
            runtime: Runtime::OpenAiCompletion,
        }
    }

    /// Constructs a variant for a different runtime tag that is wire
    /// compatible with OpenAI Completions (used by [`super::OpenRouterAdapter`]
    /// and [`super::XaiAdapter`]).
    pub(crate) fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = runtime;
        self
    }

    fn tools_payload(&self) -> Option<Vec<serde_json::Value>> {
        if self.tools.is_empty() {
            return None;
        }
        Some(
            self.tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.schema,
                        }
                    })
                })
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiCompletionAdapter {
    fn runtime(&self) -> Runtime {
        self.runtime
    }

    fn bind_tools(&self, tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter> {
        Box::new(Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            tools,
            timeout: self.timeout,
            runtime: self.runtime,
        })
    }

    async fn stream(&self, messages: &[Message], reasoning_effort: ReasoningEffort) -> Result<ContentBlockStream> {
        let request = WireRequest {
            model: self.model.clone(),
            messages: messages.iter().map(message_to_wire).collect(),
            stream: true,
            max_tokens: None,
            temperature: None,
            tools: self.tools_payload(),
            reasoning_effort: reasoning_effort_param(reasoning_effort),
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider_unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider_rejected(body));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider_unavailable(format!("{status}: {body}")));
        }

        let chunks = parse_sse(response);
        let stream = chunks.scan(BlockAccumulator::default(), |acc, chunk_result| {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => return futures::future::ready(Some(futures::stream::iter(vec![Err(e)]))),
            };

            let mut blocks_out = Vec::new();
            for choice in chunk.choices {
                if let Some(text) = choice.delta.content {
                    acc.push_text(&text);
                }
                if let Some(reasoning) = choice.delta.reasoning {
                    acc.push_reasoning(&reasoning);
                }
                if let Some(tool_calls) = choice.delta.tool_calls {
                    for delta in tool_calls {
                        if let Some(id) = delta.id {
                            let name = delta
                                .function
                                .as_ref()
                                .and_then(|f| f.name.clone())
                                .unwrap_or_default();
                            acc.start_tool_call(id, name);
                        }
                        if let Some(function) = delta.function {
                            if let Some(arguments) = function.arguments {
                                acc.push_tool_call_arguments(&arguments);
                            }
                        }
                    }
                }
                if choice.finish_reason.is_some() {
                    match acc.finish() {
                        Ok(finished) => blocks_out.extend(finished.into_iter().map(Ok)),
                        Err(e) => blocks_out.push(Err(e)),
                    }
                }
            }
            futures::future::ready(Some(futures::stream::iter(blocks_out)))
        });

        Ok(Box::pin(stream.flatten()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_block::Message;

    #[tokio::test]
    async fn streams_text_then_finishes_on_finish_reason() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"world\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let adapter = OpenAiCompletionAdapter::new(server.url(), "not-needed", "test-model");
        let messages = vec![Message::user("hi")];
        let blocks = adapter.generate(&messages, ReasoningEffort::Off).await.unwrap();

        mock.assert_async().await;
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            ContentBlock::Text(t) => assert_eq!(t.text, "Hello world"),
            other => panic!("expected text block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn accumulates_fragmented_tool_call_across_chunks() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"get_weather\",\"arguments\":\"{\\\"loc\"}}]},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"ation\\\":\\\"Paris\\\"}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let adapter = OpenAiCompletionAdapter::new(server.url(), "not-needed", "test-model");
        let messages = vec![Message::user("weather in paris?")];
        let blocks = adapter.generate(&messages, ReasoningEffort::Off).await.unwrap();

        mock.assert_async().await;
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            ContentBlock::ToolCall(call) => {
                assert_eq!(call.id, "call_1");
                assert_eq!(call.name, "get_weather");
                assert_eq!(call.args["location"], "Paris");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn auth_failure_maps_to_provider_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let adapter = OpenAiCompletionAdapter::new(server.url(), "bad-key", "test-model");
        let err = adapter
            .generate(&[Message::user("hi")], ReasoningEffort::Off)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, Error::ProviderRejected(_)));
    }

    #[test]
    fn bind_tools_returns_new_view_without_mutating_self() {
        let adapter = OpenAiCompletionAdapter::new("http://localhost", "k", "m");
        assert!(adapter.tools.is_empty());
        let bound = adapter.bind_tools(vec![ToolDefinition {
            name: "search".into(),
            description: "search the web".into(),
            schema: serde_json::json!({"type": "object"}),
        }]);
        assert!(adapter.tools.is_empty());
        assert_eq!(bound.runtime(), Runtime::OpenAiCompletion);
    }
}
