//! Adapter for the Gemini `generateContent`/`streamGenerateContent` API.
//!
//! Part naming (`functionCall`, `functionResponse`, `inlineData`,
//! `thoughtSignature`) follows `examples/grafbase-nexus/crates/llm/src/provider/google/input.rs`.
//! Gemini streams whole JSON array elements rather than SSE deltas per
//! text token, so the accumulator here collapses per-candidate parts
//! directly instead of tracking partial-argument fragments.

use super::{ContentBlockStream, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition};
use crate::content_block::{ContentBlock, Message, MessageRole, ReasoningBlock};
use crate::{Error, Result};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<WireThinkingConfig>,
}

#[derive(Debug, Serialize)]
struct WireThinkingConfig {
    #[serde(rename = "thinkingBudget")]
    thinking_budget: i32,
    #[serde(rename = "includeThoughts")]
    include_thoughts: bool,
}

#[derive(Debug, Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<serde_json::Value>,
}

fn split_system(messages: &[Message]) -> (Option<WireContent>, Vec<WireContent>) {
    let mut system = None;
    let mut contents = Vec::new();

    for message in messages {
        if message.role == MessageRole::System {
            let text: String = message
                .content
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text(t) => Some(t.text.clone()),
                    _ => None,
                })
                .collect();
            system = Some(WireContent {
                role: "user",
                parts: vec![serde_json::json!({"text": text})],
            });
            continue;
        }
        contents.push(message_to_content(message));
    }

    (system, contents)
}

fn message_to_content(message: &Message) -> WireContent {
    let role = match message.role {
        MessageRole::Assistant => "model",
        _ => "user",
    };

    let parts = message
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text(t) => serde_json::json!({"text": t.text}),
            ContentBlock::Reasoning(r) => {
                let mut value = serde_json::json!({"text": r.reasoning, "thought": true});
                if let Some(signature) = r.extras.get("thoughtSignature") {
                    value["thoughtSignature"] = signature.clone();
                }
                value
            }
            ContentBlock::ToolCall(call) => serde_json::json!({
                "functionCall": {"name": call.name, "args": call.args},
            }),
            ContentBlock::ToolOutput(output) => serde_json::json!({
                "functionResponse": {
                    "name": output.call_id,
                    "response": {"content": output.content},
                },
            }),
            ContentBlock::Image(image) => serde_json::json!({
                "inlineData": {"mimeType": image.mime_type, "data": image.to_base64_string()},
            }),
        })
        .collect();

    WireContent { role, parts }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: WireResponseContent,
}

#[derive(Debug, Default, Deserialize)]
struct WireResponseContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Debug, Deserialize)]
struct WireResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    #[serde(rename = "thoughtSignature")]
    thought_signature: Option<String>,
    #[serde(rename = "functionCall")]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    args: serde_json::Map<String, serde_json::Value>,
}

/// Gemini's streaming endpoint emits a top-level JSON array whose elements
/// are complete [`WireResponse`] objects, not SSE `data:` lines with partial
/// deltas. We split on the `}\r\n,\r\n{` element boundary the wire emits
/// between array entries.
fn parse_stream(response: reqwest::Response) -> Pin<Box<dyn Stream<Item = Result<WireResponse>> + Send>> {
    let stream = futures::stream::unfold(
        (response.bytes_stream(), String::new(), false),
        |(mut bytes_stream, mut buf, mut started)| async move {
            loop {
                while let Some(start) = buf.find('{') {
                    if !started {
                        buf.drain(..start);
                        started = true;
                    }
                    match find_balanced_object(&buf) {
                        Some(end) => {
                            let object = buf[..end].to_string();
                            buf.drain(..end);
                            if let Some(trim_start) = buf.find('{') {
                                buf.drain(..trim_start);
                            } else {
                                buf.clear();
                            }
                            let parsed = serde_json::from_str::<WireResponse>(&object)
                                .map_err(|e| Error::malformed_response(format!("bad Gemini chunk: {e}")));
                            return Some((parsed, (bytes_stream, buf, started)));
                        }
                        None => break,
                    }
                }

                match bytes_stream.next().await {
                    Some(Ok(bytes)) => buf.push_str(&String::from_utf8_lossy(&bytes)),
                    Some(Err(e)) => return Some((Err(Error::Http(e)), (bytes_stream, buf, started))),
                    None => return None,
                }
            }
        },
    );
    Box::pin(stream)
}

fn find_balanced_object(buf: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in buf.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

pub struct GeminiAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    tools: Vec<ToolDefinition>,
    timeout: Duration,
}

impl GeminiAdapter {
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

    fn thinking_config(effort: ReasoningEffort) -> Option<WireThinkingConfig> {
        let thinking_budget = match effort {
            ReasoningEffort::Off => return None,
            ReasoningEffort::Minimal => 512,
            ReasoningEffort::Low => 2048,
            ReasoningEffort::Medium => 8192,
            ReasoningEffort::High => 24576,
        };
        Some(WireThinkingConfig { thinking_budget, include_thoughts: true })
    }

    fn tools_payload(&self) -> Option<Vec<serde_json::Value>> {
        if self.tools.is_empty() {
            return None;
        }
        Some(vec![serde_json::json!({
            "functionDeclarations": self.tools.iter().map(|t| serde_json::json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.schema,
            })).collect::<Vec<_>>()
        })])
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn runtime(&self) -> Runtime {
        Runtime::Gemini
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
        let (system_instruction, contents) = split_system(messages);
        let request = WireRequest {
            contents,
            system_instruction,
            tools: self.tools_payload(),
            generation_config: Self::thinking_config(reasoning_effort)
                .map(|thinking_config| WireGenerationConfig { thinking_config: Some(thinking_config) }),
        };

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
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

        let chunks = parse_stream(response);
        let stream = chunks.map(|chunk_result| {
            let chunk = chunk_result?;
            let mut blocks = Vec::new();
            for candidate in chunk.candidates {
                for part in candidate.content.parts {
                    if let Some(call) = part.function_call {
                        blocks.push(ContentBlock::tool_call(
                            format!("call_{}", call.name),
                            call.name,
                            call.args,
                        ));
                        continue;
                    }
                    let Some(text) = part.text else { continue };
                    if part.thought {
                        let mut reasoning = ReasoningBlock::new(text);
                        if let Some(signature) = part.thought_signature {
                            reasoning.extras.insert("thoughtSignature".to_string(), serde_json::json!(signature));
                        }
                        blocks.push(ContentBlock::Reasoning(reasoning));
                    } else {
                        blocks.push(ContentBlock::text(text));
                    }
                }
            }
            Ok(blocks)
        });

        let stream = stream.flat_map(|result: Result<Vec<ContentBlock>>| match result {
            Ok(blocks) => futures::stream::iter(blocks.into_iter().map(Ok).collect::<Vec<_>>()),
            Err(e) => futures::stream::iter(vec![Err(e)]),
        });

        Ok(Box::pin(stream))
    }
}
