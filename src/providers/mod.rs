//! Provider Adapter: a uniform capability set over heterogeneous upstream
//! LLM wire formats.
//!
//! Each adapter presents `generate`/`stream`/`bind_tools`, regardless of
//! the provider's native protocol. `bind_tools` is a pure configuration
//! step returning a new bound view — it never mutates the adapter it's
//! called on.

mod anthropic;
mod gemini;
mod openai_completion;
mod openai_responses;
mod openrouter;
mod xai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai_completion::OpenAiCompletionAdapter;
pub use openai_responses::OpenAiResponsesAdapter;
pub use openrouter::OpenRouterAdapter;
pub use xai::XaiAdapter;

use crate::content_block::{ContentBlock, Message};
use crate::Result;
use futures::stream::Stream;
use std::pin::Pin;

/// The wire-protocol family a given operator speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    OpenAiResponses,
    OpenAiCompletion,
    Anthropic,
    Gemini,
    Xai,
    OpenRouter,
}

impl Runtime {
    /// Per-runtime default tool-call hop budget.
    pub fn default_tool_call_limit(self) -> u32 {
        match self {
            Runtime::Anthropic => 25,
            _ => 10,
        }
    }
}

/// Coarse ordinal dial for models that expose a chain-of-thought budget.
/// `Off` means the reasoning parameter is omitted entirely, not set to a
/// minimal value — the two are different wire payloads for providers that
/// treat "no parameter" as "default effort".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningEffort {
    Off,
    Minimal,
    Low,
    Medium,
    High,
}

/// A tool descriptor as presented to a provider for tool-binding: name,
/// human description, and a JSON Schema for its arguments.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// A lazy, finite, non-restartable sequence of [`ContentBlock`]s.
pub type ContentBlockStream = Pin<Box<dyn Stream<Item = Result<ContentBlock>> + Send>>;

/// Uniform capability set presented by every upstream provider.
///
/// # Contract
///
/// - Within a single call, reasoning blocks precede the text or tool_call
///   block they justify.
/// - Tool calls are emitted whole, never as partial-token fragments — the
///   adapter buffers partial JSON argument fragments internally and emits
///   the `ToolCall` block only when the provider signals completion.
/// - `generate` materializes the stream into the single terminal assistant
///   turn's blocks; `stream` exposes the live sequence.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Runtime family this adapter implements; used for tool-call-limit
    /// defaults and logging.
    fn runtime(&self) -> Runtime;

    /// Returns a new adapter view bound to the given tools. Does not
    /// mutate `self` — binding is a pure configuration step.
    fn bind_tools(&self, tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter>;

    /// Streams the model's next turn as content blocks.
    async fn stream(
        &self,
        messages: &[Message],
        reasoning_effort: ReasoningEffort,
    ) -> Result<ContentBlockStream>;

    /// Unary variant: materializes the stream into the blocks of one
    /// terminal assistant turn.
    async fn generate(
        &self,
        messages: &[Message],
        reasoning_effort: ReasoningEffort,
    ) -> Result<Vec<ContentBlock>> {
        use futures::StreamExt;
        let mut stream = self.stream(messages, reasoning_effort).await?;
        let mut blocks = Vec::new();
        while let Some(block) = stream.next().await {
            blocks.push(block?);
        }
        Ok(blocks)
    }
}

/// Shared helper: validates that a streamed sequence of blocks respects
/// the ordering guarantee (reasoning before text/tool_call). Adapters
/// that build blocks through [`BlockAccumulator`] already satisfy this;
/// this function exists for adapter-level tests.
pub fn reasoning_precedes_terminal(blocks: &[ContentBlock]) -> bool {
    let mut seen_terminal = false;
    for block in blocks {
        match block {
            ContentBlock::Reasoning(_) => {
                if seen_terminal {
                    return false;
                }
            }
            ContentBlock::Text(_) | ContentBlock::ToolCall(_) => seen_terminal = true,
            _ => {}
        }
    }
    true
}

/// Accumulates streamed deltas into whole [`ContentBlock`]s, shared across
/// adapters since every wire format distinguishes "still streaming" from
/// "block complete" even though the completion signal differs per
/// protocol (`finish_reason`, `content_block_stop`, `candidate.finishReason`).
///
/// Shared across every adapter so each one only has to describe its own
/// wire format's deltas, not reimplement block assembly.
#[derive(Debug, Default)]
pub(crate) struct BlockAccumulator {
    text: String,
    reasoning: String,
    reasoning_extras: std::collections::BTreeMap<String, serde_json::Value>,
    pending_tool_call: Option<PendingToolCall>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl BlockAccumulator {
    pub fn push_text(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    pub fn push_reasoning(&mut self, delta: &str) {
        self.reasoning.push_str(delta);
    }

    pub fn set_reasoning_extra(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.reasoning_extras.insert(key.into(), value);
    }

    pub fn start_tool_call(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.pending_tool_call = Some(PendingToolCall {
            id: id.into(),
            name: name.into(),
            arguments: String::new(),
        });
    }

    pub fn push_tool_call_arguments(&mut self, delta: &str) {
        if let Some(pending) = &mut self.pending_tool_call {
            pending.arguments.push_str(delta);
        }
    }

    pub fn has_pending_tool_call(&self) -> bool {
        self.pending_tool_call.is_some()
    }

    /// Finishes the turn: parses the accumulated tool-call JSON once and
    /// returns blocks in the mandated order (reasoning, text, tool_call),
    /// omitting any that are empty.
    pub fn finish(&mut self) -> Result<Vec<ContentBlock>> {
        let mut blocks = Vec::new();

        if !self.reasoning.is_empty() {
            blocks.push(ContentBlock::Reasoning(crate::content_block::ReasoningBlock {
                reasoning: std::mem::take(&mut self.reasoning),
                extras: std::mem::take(&mut self.reasoning_extras),
            }));
        }

        if !self.text.is_empty() {
            blocks.push(ContentBlock::text(std::mem::take(&mut self.text)));
        }

        if let Some(pending) = self.pending_tool_call.take() {
            let args: serde_json::Map<String, serde_json::Value> = if pending.arguments.trim().is_empty() {
                serde_json::Map::new()
            } else {
                match serde_json::from_str::<serde_json::Value>(&pending.arguments) {
                    Ok(serde_json::Value::Object(map)) => map,
                    Ok(other) => {
                        let mut map = serde_json::Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                    Err(e) => {
                        return Err(crate::Error::malformed_response(format!(
                            "tool call arguments were not valid JSON: {e}"
                        )));
                    }
                }
            };
            blocks.push(ContentBlock::tool_call(pending.id, pending.name, args));
        }

        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tool_call_limit_is_higher_for_anthropic() {
        assert_eq!(Runtime::Anthropic.default_tool_call_limit(), 25);
        assert_eq!(Runtime::OpenAiCompletion.default_tool_call_limit(), 10);
        assert_eq!(Runtime::Gemini.default_tool_call_limit(), 10);
    }

    #[test]
    fn accumulator_emits_reasoning_before_text_before_tool_call() {
        let mut acc = BlockAccumulator::default();
        acc.push_reasoning("because the user asked");
        acc.push_text("here you go");
        acc.start_tool_call("call_1", "search");
        acc.push_tool_call_arguments(r#"{"q":"rust"}"#);
        let blocks = acc.finish().unwrap();
        assert!(reasoning_precedes_terminal(&blocks));
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[0], ContentBlock::Reasoning(_)));
        assert!(matches!(blocks[1], ContentBlock::Text(_)));
        assert!(matches!(blocks[2], ContentBlock::ToolCall(_)));
    }

    #[test]
    fn accumulator_parses_fragmented_json_arguments_once() {
        let mut acc = BlockAccumulator::default();
        acc.start_tool_call("call_2", "get_weather");
        acc.push_tool_call_arguments("{\"loc");
        acc.push_tool_call_arguments("ation\":");
        acc.push_tool_call_arguments("\"Paris\"}");
        let blocks = acc.finish().unwrap();
        match &blocks[0] {
            ContentBlock::ToolCall(call) => {
                assert_eq!(call.id, "call_2");
                assert_eq!(call.args["location"], "Paris");
            }
            _ => panic!("expected tool call"),
        }
    }

    #[test]
    fn accumulator_errors_on_invalid_json_arguments() {
        let mut acc = BlockAccumulator::default();
        acc.start_tool_call("call_3", "broken");
        acc.push_tool_call_arguments("{not json");
        assert!(acc.finish().is_err());
    }

    #[test]
    fn accumulator_omits_empty_blocks() {
        let mut acc = BlockAccumulator::default();
        acc.push_text("only text");
        let blocks = acc.finish().unwrap();
        assert_eq!(blocks.len(), 1);
    }
}
