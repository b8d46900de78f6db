//! Verifies that lifecycle hooks attached to a [`Client`]/[`AgentGraph`]
//! actually intercept tool calls end to end, rather than just exercising
//! the [`Hooks`] container in isolation.

use agent_core::content_block::{ContentBlock, Message, MessageRole};
use agent_core::graph::{AgentGraph, GraphEvent};
use agent_core::providers::{ContentBlockStream, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition};
use agent_core::tool;
use agent_core::tools::{DefaultDispatcher, ToolRegistry};
use agent_core::{HookDecision, Hooks, Result};
use async_trait::async_trait;
use futures::stream;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

struct SingleToolCall {
    tool_name: &'static str,
}

#[async_trait]
impl ProviderAdapter for SingleToolCall {
    fn runtime(&self) -> Runtime {
        Runtime::OpenAiCompletion
    }

    fn bind_tools(&self, _tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter> {
        Box::new(SingleToolCall { tool_name: self.tool_name })
    }

    async fn stream(&self, messages: &[Message], _effort: ReasoningEffort) -> Result<ContentBlockStream> {
        if messages.iter().any(|m| matches!(m.role, MessageRole::Tool)) {
            return Ok(Box::pin(stream::iter(vec![Ok(ContentBlock::text("finished"))])));
        }
        let mut args = serde_json::Map::new();
        args.insert("path".to_string(), json!("/etc/passwd"));
        Ok(Box::pin(stream::iter(vec![Ok(ContentBlock::tool_call(
            "call-1",
            self.tool_name,
            args,
        ))])))
    }
}

#[tokio::test]
async fn pre_tool_use_hook_blocks_a_dangerous_call() {
    let delete_tool = tool("delete_file", "Deletes a file")
        .param("path", "string")
        .build(|_args| async move { Ok(json!({"deleted": true})) });

    let registry = Arc::new(ToolRegistry::new(vec![delete_tool]));
    let dispatcher = Arc::new(DefaultDispatcher::new());
    let adapter = Arc::new(SingleToolCall { tool_name: "delete_file" });

    let hooks = Hooks::new().add_pre_tool_use(|event| async move {
        if event.tool_name == "delete_file" {
            return Some(HookDecision::block("destructive tools are not allowed"));
        }
        None
    });

    let graph = AgentGraph::new(adapter, registry, dispatcher, 10, 20).with_hooks(hooks);
    let (tx, mut rx) = mpsc::channel(16);

    let task = tokio::spawn(async move { graph.run(vec![Message::user("delete it")], tx).await });

    let mut tool_result_text = String::new();
    while let Some(event) = rx.recv().await {
        if let GraphEvent::ToolResult(ContentBlock::ToolOutput(output)) = event {
            tool_result_text = output.content;
        }
    }

    task.await.unwrap().unwrap();
    assert!(tool_result_text.contains("blocked by hook"));
    assert!(tool_result_text.contains("destructive tools are not allowed"));
}

#[tokio::test]
async fn post_tool_use_hook_can_rewrite_the_result() {
    let echo_tool = tool("echo", "Echoes its input")
        .param("path", "string")
        .build(|args| async move { Ok(args) });

    let registry = Arc::new(ToolRegistry::new(vec![echo_tool]));
    let dispatcher = Arc::new(DefaultDispatcher::new());
    let adapter = Arc::new(SingleToolCall { tool_name: "echo" });

    let hooks = Hooks::new().add_post_tool_use(|_event| async move {
        Some(HookDecision::modify_input(json!({"redacted": true}), "scrubbed for audit"))
    });

    let graph = AgentGraph::new(adapter, registry, dispatcher, 10, 20).with_hooks(hooks);
    let (tx, mut rx) = mpsc::channel(16);

    let task = tokio::spawn(async move { graph.run(vec![Message::user("echo it")], tx).await });

    let mut tool_result_text = String::new();
    while let Some(event) = rx.recv().await {
        if let GraphEvent::ToolResult(ContentBlock::ToolOutput(output)) = event {
            tool_result_text = output.content;
        }
    }

    task.await.unwrap().unwrap();
    assert!(tool_result_text.contains("redacted"));
}
