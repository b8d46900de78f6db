//! Adapter for the Anthropic Messages API.
//!
//! SSE event shape (`content_block_start`/`_delta`/`_stop`,
//! `message_delta`, `message_stop`) grounded in
//! `examples/grafbase-nexus/crates/llm/src/protocol/anthropic/messages/sse.rs`.
//! Streaming/aggregation plumbing follows the same pattern as
//! [`super::openai_completion`], generalized to Anthropic's per-block
//! (rather than per-choice) event stream.

use super::{BlockAccumulator, ContentBlockStream, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition};
use crate::content_block::{ContentBlock, Message, MessageRole};
use crate::{Error, Result};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<serde_json::Value>,
}

/// Translates unified messages into Anthropic's content-block array shape,
/// separating the leading system message out (Anthropic takes `system`
/// as a top-level field, not a message with `role: "system"`).
fn split_system(messages: &[Message]) -> (Option<String>, Vec<WireMessage>) {
    let mut system = None;
    let mut wire = Vec::new();

    for message in messages {
        if message.role == MessageRole::System {
            let mut text = String::new();
            for block in &message.content {
                if let ContentBlock::Text(t) = block {
                    text.push_str(&t.text);
                }
            }
            system = Some(text);
            continue;
        }
        wire.push(message_to_wire(message));
    }

    (system, wire)
}

fn message_to_wire(message: &Message) -> WireMessage {
    let role = match message.role {
        MessageRole::Assistant => "assistant",
        // Anthropic has no distinct tool role; tool_output travels as a
        // user-turn tool_result content block.
        _ => "user",
    };

    let content = message
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text(t) => serde_json::json!({"type": "text", "text": t.text}),
            ContentBlock::Reasoning(r) => {
                let mut value = serde_json::json!({"type": "thinking", "thinking": r.reasoning});
                if let Some(signature) = r.extras.get("signature") {
                    value["signature"] = signature.clone();
                }
                value
            }
            ContentBlock::ToolCall(call) => serde_json::json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.name,
                "input": call.args,
            }),
            ContentBlock::ToolOutput(output) => serde_json::json!({
                "type": "tool_result",
                "tool_use_id": output.call_id,
                "content": output.content,
            }),
            ContentBlock::Image(image) => serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.mime_type,
                    "data": image.to_base64_string(),
                },
            }),
        })
        .collect();

    WireMessage { role, content }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    MessageStart,
    ContentBlockStart {
        index: u32,
        content_block: WireContentBlockStart,
    },
    ContentBlockDelta {
        index: u32,
        delta: WireDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta,
    MessageStop,
    Ping,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContentBlockStart {
    Text { text: String },
    Thinking { thinking: String },
    ToolUse { id: String, name: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Unknown,
}

fn parse_sse(response: reqwest::Response) -> Pin<Box<dyn Stream<Item = Result<WireEvent>> + Send>> {
    let stream = response.bytes_stream().filter_map(move |result| async move {
        let bytes = match result.map_err(Error::Http) {
            Ok(b) => b,
            Err(e) => return Some(Err(e)),
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        for line in text.lines() {
            if let Some(data) = line.strip_prefix("data: ") {
                return Some(
                    serde_json::from_str::<WireEvent>(data)
                        .map_err(|e| Error::malformed_response(format!("bad SSE event: {e}"))),
                );
            }
        }
        None
    });
    Box::pin(stream)
}

pub struct AnthropicAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    tools: Vec<ToolDefinition>,
    timeout: Duration,
    max_tokens: u32,
}

impl AnthropicAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            tools: Vec::new(),
            timeout: Duration::from_secs(120),
            max_tokens: 4096,
        }
    }

    fn thinking_config(effort: ReasoningEffort) -> Option<ThinkingConfig> {
        let budget_tokens = match effort {
            ReasoningEffort::Off => return None,
            ReasoningEffort::Minimal => 1024,
            ReasoningEffort::Low => 2048,
            ReasoningEffort::Medium => 8192,
            ReasoningEffort::High => 24576,
        };
        Some(ThinkingConfig { kind: "enabled", budget_tokens })
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
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.schema,
                    })
                })
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn runtime(&self) -> Runtime {
        Runtime::Anthropic
    }

    fn bind_tools(&self, tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter> {
        Box::new(Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            tools,
            timeout: self.timeout,
            max_tokens: self.max_tokens,
        })
    }

    async fn stream(&self, messages: &[Message], reasoning_effort: ReasoningEffort) -> Result<ContentBlockStream> {
        let (system, wire_messages) = split_system(messages);
        let request = WireRequest {
            model: self.model.clone(),
            messages: wire_messages,
            system,
            max_tokens: self.max_tokens,
            stream: true,
            tools: self.tools_payload(),
            thinking: Self::thinking_config(reasoning_effort),
        };

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let events = parse_sse(response);
        let stream = events.scan(
            (BlockAccumulator::default(), None::<WireContentBlockStart>),
            |(acc, open_block), event_result| {
                let event = match event_result {
                    Ok(e) => e,
                    Err(e) => return futures::future::ready(Some(futures::stream::iter(vec![Err(e)]))),
                };

                let mut out = Vec::new();
                match event {
                    WireEvent::ContentBlockStart { content_block, .. } => {
                        if let WireContentBlockStart::ToolUse { ref id, ref name } = content_block {
                            acc.start_tool_call(id.clone(), name.clone());
                        }
                        if let WireContentBlockStart::Text { ref text } = content_block {
                            acc.push_text(text);
                        }
                        if let WireContentBlockStart::Thinking { ref thinking } = content_block {
                            acc.push_reasoning(thinking);
                        }
                        *open_block = Some(content_block);
                    }
                    WireEvent::ContentBlockDelta { delta, .. } => match delta {
                        WireDelta::TextDelta { text } => acc.push_text(&text),
                        WireDelta::ThinkingDelta { thinking } => acc.push_reasoning(&thinking),
                        WireDelta::SignatureDelta { signature } => {
                            acc.set_reasoning_extra("signature", serde_json::json!(signature))
                        }
                        WireDelta::InputJsonDelta { partial_json } => acc.push_tool_call_arguments(&partial_json),
                        WireDelta::Unknown => {}
                    },
                    WireEvent::ContentBlockStop { .. } => {
                        *open_block = None;
                    }
                    WireEvent::MessageStop => match acc.finish() {
                        Ok(blocks) => out.extend(blocks.into_iter().map(Ok)),
                        Err(e) => out.push(Err(e)),
                    },
                    _ => {}
                }
                futures::future::ready(Some(futures::stream::iter(out)))
            },
        );

        Ok(Box::pin(stream.flatten()))
    }
}
