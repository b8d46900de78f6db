//! Adapter for the OpenAI Responses API (`/v1/responses`), the
//! reasoning-item-aware successor to Chat Completions.
//!
//! The wire protocol is event-typed SSE (`response.output_text.delta`,
//! `response.reasoning_summary_text.delta`, `response.function_call_arguments.delta`,
//! `response.output_item.done`, `response.completed`) rather than
//! per-choice deltas, so this adapter tracks the open output item by
//! `item_id` instead of a single pending tool call like
//! [`super::openai_completion`].

use super::{ContentBlockStream, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition};
use crate::content_block::{ContentBlock, Message, MessageRole};
use crate::{Error, Result};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    input: Vec<WireInputItem>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<WireReasoning>,
}

#[derive(Debug, Serialize)]
struct WireReasoning {
    effort: &'static str,
    summary: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireInputItem {
    Message { role: &'static str, content: String },
    FunctionCall { call_id: String, name: String, arguments: String },
    FunctionCallOutput { call_id: String, output: String },
}

fn message_to_input(message: &Message) -> Vec<WireInputItem> {
    let role = match message.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "user",
    };

    let mut items = Vec::new();
    let mut text = String::new();

    for block in &message.content {
        match block {
            ContentBlock::Text(t) => text.push_str(&t.text),
            // No replay signature exists in this wire format; reasoning is
            // dropped rather than folded into the visible message.
            ContentBlock::Reasoning(_) => {}
            ContentBlock::ToolCall(call) => items.push(WireInputItem::FunctionCall {
                call_id: call.id.clone(),
                name: call.name.clone(),
                arguments: serde_json::Value::Object(call.args.clone()).to_string(),
            }),
            ContentBlock::ToolOutput(output) => items.push(WireInputItem::FunctionCallOutput {
                call_id: output.call_id.clone(),
                output: output.content.clone(),
            }),
            ContentBlock::Image(_) => {}
        }
    }

    if !text.is_empty() {
        items.insert(0, WireInputItem::Message { role, content: text });
    }

    items
}

fn reasoning_param(effort: ReasoningEffort) -> Option<WireReasoning> {
    let effort_str = match effort {
        ReasoningEffort::Off => return None,
        ReasoningEffort::Minimal => "minimal",
        ReasoningEffort::Low => "low",
        ReasoningEffort::Medium => "medium",
        ReasoningEffort::High => "high",
    };
    Some(WireReasoning { effort: effort_str, summary: "auto" })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireEvent {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { item_id: String, delta: String },
    #[serde(rename = "response.reasoning_summary_text.delta")]
    ReasoningSummaryDelta { item_id: String, delta: String },
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta { item_id: String, delta: String },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { item: WireOutputItem },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: WireOutputItem },
    #[serde(rename = "response.completed")]
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct WireOutputItem {
    id: String,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
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

#[derive(Default)]
struct OpenItem {
    name: String,
    call_id: String,
    arguments: String,
}

pub struct OpenAiResponsesAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    tools: Vec<ToolDefinition>,
    timeout: Duration,
}

impl OpenAiResponsesAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            tools: Vec::new(),
            timeout: Duration::from_secs(120),
        }
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
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.schema,
                    })
                })
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiResponsesAdapter {
    fn runtime(&self) -> Runtime {
        Runtime::OpenAiResponses
    }

    fn bind_tools(&self, tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter> {
        Box::new(Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            tools,
            timeout: self.timeout,
        })
    }

    async fn stream(&self, messages: &[Message], reasoning_effort: ReasoningEffort) -> Result<ContentBlockStream> {
        let request = WireRequest {
            model: self.model.clone(),
            input: messages.iter().flat_map(message_to_input).collect(),
            stream: true,
            tools: self.tools_payload(),
            reasoning: reasoning_param(reasoning_effort),
        };

        let url = format!("{}/v1/responses", self.base_url);
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

        let events = parse_sse(response);
        let stream = events.scan(
            (String::new(), String::new(), HashMap::<String, OpenItem>::new()),
            |(text, reasoning, open_items), event_result| {
                let event = match event_result {
                    Ok(e) => e,
                    Err(e) => return futures::future::ready(Some(futures::stream::iter(vec![Err(e)]))),
                };

                let mut out = Vec::new();
                match event {
                    WireEvent::OutputTextDelta { delta, .. } => text.push_str(&delta),
                    WireEvent::ReasoningSummaryDelta { delta, .. } => reasoning.push_str(&delta),
                    WireEvent::OutputItemAdded { item } if item.item_type == "function_call" => {
                        open_items.insert(
                            item.id,
                            OpenItem {
                                name: item.name.unwrap_or_default(),
                                call_id: item.call_id.unwrap_or_default(),
                                arguments: String::new(),
                            },
                        );
                    }
                    WireEvent::FunctionCallArgumentsDelta { item_id, delta } => {
                        if let Some(open) = open_items.get_mut(&item_id) {
                            open.arguments.push_str(&delta);
                        }
                    }
                    WireEvent::OutputItemDone { item } if item.item_type == "function_call" => {
                        if let Some(open) = open_items.remove(&item.id) {
                            let args = if open.arguments.trim().is_empty() {
                                serde_json::Map::new()
                            } else {
                                match serde_json::from_str::<serde_json::Value>(&open.arguments) {
                                    Ok(serde_json::Value::Object(map)) => map,
                                    Ok(_) | Err(_) => serde_json::Map::new(),
                                }
                            };
                            out.push(Ok(ContentBlock::tool_call(open.call_id, open.name, args)));
                        }
                    }
                    WireEvent::Completed => {
                        if !reasoning.is_empty() {
                            out.push(Ok(ContentBlock::reasoning(std::mem::take(reasoning))));
                        }
                        if !text.is_empty() {
                            out.push(Ok(ContentBlock::text(std::mem::take(text))));
                        }
                    }
                    _ => {}
                }
                futures::future::ready(Some(futures::stream::iter(out)))
            },
        );

        Ok(Box::pin(stream.flatten()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reasoning_text_precedes_output_text_on_completion() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"type\":\"response.reasoning_summary_text.delta\",\"item_id\":\"r1\",\"delta\":\"thinking\"}\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"item_id\":\"t1\",\"delta\":\"answer\"}\n\n",
            "data: {\"type\":\"response.completed\"}\n\n",
        );
        let mock = server.mock("POST", "/v1/responses").with_status(200).with_body(body).create_async().await;

        let adapter = OpenAiResponsesAdapter::new(server.url(), "k", "gpt-test");
        let blocks = adapter
            .generate(&[Message::user("hi")], ReasoningEffort::Medium)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], ContentBlock::Reasoning(_)));
        assert!(matches!(&blocks[1], ContentBlock::Text(t) if t.text == "answer"));
    }

    #[tokio::test]
    async fn function_call_item_resolves_on_output_item_done() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"type\":\"response.output_item.added\",\"item\":{\"id\":\"item_1\",\"type\":\"function_call\",\"name\":\"lookup\",\"call_id\":\"call_1\"}}\n\n",
            "data: {\"type\":\"response.function_call_arguments.delta\",\"item_id\":\"item_1\",\"delta\":\"{\\\"q\\\":\"}\n\n",
            "data: {\"type\":\"response.function_call_arguments.delta\",\"item_id\":\"item_1\",\"delta\":\"\\\"x\\\"}\"}\n\n",
            "data: {\"type\":\"response.output_item.done\",\"item\":{\"id\":\"item_1\",\"type\":\"function_call\",\"name\":\"lookup\",\"call_id\":\"call_1\"}}\n\n",
            "data: {\"type\":\"response.completed\"}\n\n",
        );
        let mock = server.mock("POST", "/v1/responses").with_status(200).with_body(body).create_async().await;

        let adapter = OpenAiResponsesAdapter::new(server.url(), "k", "gpt-test");
        let blocks = adapter
            .generate(&[Message::user("hi")], ReasoningEffort::Off)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            ContentBlock::ToolCall(call) => {
                assert_eq!(call.id, "call_1");
                assert_eq!(call.args["q"], "x");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }
}
