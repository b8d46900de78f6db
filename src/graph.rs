//! Agent Graph Engine: the bounded `call_model` / `call_tools` / `END`
//! state machine that drives one request, emitting [`GraphEvent`]s over a
//! channel as it goes.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::content_block::{AgentState, BlockKind, ContentBlock, Message, MessageRole, ToolCallHistory};
use crate::hooks::{Hooks, PostToolUseEvent, PreToolUseEvent};
use crate::providers::{ContentBlockStream, ProviderAdapter, ReasoningEffort};
use crate::tools::{Dispatcher, ToolRegistry};
use crate::{Error, Result};

/// One step of graph execution, surfaced to the Transcript Writer.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// A content block produced by `call_model`, in emission order.
    ModelBlock(ContentBlock),
    /// One tool's result, produced by `call_tools`.
    ToolResult(ContentBlock),
    /// The graph reached `END`.
    Done,
    /// The graph aborted: recursion budget exceeded or a terminal
    /// provider/tool error. The run still emits `Done` after this.
    Failed(String),
}

/// Which state the graph is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    CallModel,
    CallTools,
    End,
}

/// Wires an agent run's collaborators: the bound provider, the tool
/// registry, the dispatcher, and any lifecycle hooks. No global lookup —
/// every dependency is injected.
pub struct AgentGraph {
    adapter: Arc<dyn ProviderAdapter>,
    tool_registry: Arc<ToolRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
    hooks: Hooks,
    tool_call_limit: u32,
    recursion_budget: usize,
    reasoning_effort: ReasoningEffort,
}

impl AgentGraph {
    pub fn new(
        adapter: Arc<dyn ProviderAdapter>,
        tool_registry: Arc<ToolRegistry>,
        dispatcher: Arc<dyn Dispatcher>,
        tool_call_limit: u32,
        recursion_budget: usize,
    ) -> Self {
        Self {
            adapter,
            tool_registry,
            dispatcher,
            hooks: Hooks::new(),
            tool_call_limit,
            recursion_budget,
            reasoning_effort: ReasoningEffort::Off,
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }

    /// Runs the graph to completion, streaming [`GraphEvent`]s over `tx` as
    /// they occur. Returns the final [`AgentState`] once the channel send
    /// side is done (receiver may have been dropped early on cancellation;
    /// that is not itself an error here).
    pub async fn run(
        &self,
        initial_messages: Vec<Message>,
        tx: mpsc::Sender<GraphEvent>,
    ) -> Result<AgentState> {
        let mut state = AgentState::new(initial_messages);
        let mut history = ToolCallHistory::new();
        let mut node = Node::CallModel;
        let mut remaining_tool_calls = self.tool_call_limit;
        let mut visits = 0usize;

        loop {
            if node == Node::End {
                let _ = tx.send(GraphEvent::Done).await;
                return Ok(state);
            }

            visits += 1;
            if visits > self.recursion_budget {
                let message = "recursion budget exceeded; ending turn with partial results";
                state.push(Message::tool_output("", message));
                state.push(Message::assistant(vec![ContentBlock::text(message)]));
                let _ = tx.send(GraphEvent::Failed(message.to_string())).await;
                let _ = tx.send(GraphEvent::Done).await;
                return Err(Error::recursion_budget_exceeded(self.recursion_budget));
            }

            node = match node {
                Node::CallModel => self.call_model(&mut state, &tx).await?,
                Node::CallTools => {
                    self.call_tools(&mut state, &mut history, &mut remaining_tool_calls, &tx)
                        .await?
                }
                Node::End => unreachable!("handled above"),
            };
        }
    }

    async fn call_model(
        &self,
        state: &mut AgentState,
        tx: &mpsc::Sender<GraphEvent>,
    ) -> Result<Node> {
        let mut stream: ContentBlockStream = self
            .adapter
            .stream(state.messages(), self.reasoning_effort)
            .await?;

        let mut blocks = Vec::new();
        {
            use futures::StreamExt;
            while let Some(block) = stream.next().await {
                let block = block?;
                let _ = tx.send(GraphEvent::ModelBlock(block.clone())).await;
                blocks.push(block);
            }
        }

        if blocks.is_empty() {
            state.push(Message::assistant(vec![ContentBlock::text("")]));
            return Ok(Node::End);
        }

        state.push(Message::assistant(blocks));
        Ok(self.next_node(state))
    }

    async fn call_tools(
        &self,
        state: &mut AgentState,
        history: &mut ToolCallHistory,
        remaining_tool_calls: &mut u32,
        tx: &mpsc::Sender<GraphEvent>,
    ) -> Result<Node> {
        let Some(last) = state.last() else {
            return Ok(Node::CallModel);
        };
        let calls: Vec<_> = last
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolCall(c) => Some(c.clone()),
                _ => None,
            })
            .collect();

        if calls.is_empty() {
            let message = "call_tools reached with no pending tool_call block";
            state.push(Message::tool_output("", message));
            return Ok(Node::CallModel);
        }

        let history_snapshot: Vec<serde_json::Value> = state
            .messages()
            .iter()
            .map(|_| serde_json::json!({}))
            .collect();

        for call in calls {
            if *remaining_tool_calls == 0 {
                let message =
                    "Tool call limit reached. No more tool calls can be made. Try to generate the final response based on the history.";
                let block = ContentBlock::tool_output(call.id.clone(), message);
                let _ = tx.send(GraphEvent::ToolResult(block)).await;
                state.push(Message::tool_output(call.id, message));
                continue;
            }
            *remaining_tool_calls -= 1;

            if history.contains(&call.name, &call.args) {
                let message = format!(
                    "Duplicate tool call detected for '{}' with the same arguments; skipping re-invocation.",
                    call.name
                );
                let block = ContentBlock::tool_output(call.id.clone(), message.clone());
                let _ = tx.send(GraphEvent::ToolResult(block)).await;
                state.push(Message::tool_output(call.id.clone(), message));
                continue;
            }

            let Some(descriptor) = self.tool_registry.resolve(&call.name).await? else {
                let message = format!("Tool '{}' is not registered.", call.name);
                let block = ContentBlock::tool_output(call.id.clone(), message.clone());
                let _ = tx.send(GraphEvent::ToolResult(block)).await;
                state.push(Message::tool_output(call.id.clone(), message));
                continue;
            };

            let pre_event = PreToolUseEvent::new(
                call.name.clone(),
                serde_json::Value::Object(call.args.clone()),
                call.id.clone(),
                history_snapshot.clone(),
            );
            let mut arguments = serde_json::Value::Object(call.args.clone());
            let mut should_invoke = true;
            let mut block_reason = None;
            if let Some(decision) = self.hooks.execute_pre_tool_use(pre_event).await {
                if !decision.continue_execution {
                    should_invoke = false;
                    block_reason = decision.reason;
                } else if let Some(modified) = decision.modified_input {
                    arguments = modified;
                }
            }

            let result = if should_invoke {
                self.dispatcher.invoke(&descriptor, arguments.clone()).await
            } else {
                serde_json::json!({
                    "error": "tool call blocked by hook",
                    "reason": block_reason.unwrap_or_default(),
                })
            };

            let post_event = PostToolUseEvent::new(
                call.name.clone(),
                arguments,
                call.id.clone(),
                result.clone(),
                history_snapshot.clone(),
            );
            let mut final_result = result;
            if let Some(decision) = self.hooks.execute_post_tool_use(post_event).await {
                if let Some(modified) = decision.modified_input {
                    final_result = modified;
                }
            }

            history.record(call.name.clone(), call.args.clone(), call.id.clone());

            let content = serde_json::to_string(&final_result).unwrap_or_default();
            let block = ContentBlock::tool_output(call.id.clone(), content.clone());
            let _ = tx.send(GraphEvent::ToolResult(block)).await;
            state.push(Message::tool_output(call.id, content));
        }

        Ok(Node::CallModel)
    }

    /// Transition table: keyed on the last message's last
    /// block, using only that last message.
    fn next_node(&self, state: &AgentState) -> Node {
        let Some(last) = state.last() else {
            return Node::End;
        };

        if last.role == MessageRole::Tool {
            return Node::CallModel;
        }

        match last.last_block() {
            Some(ContentBlock::ToolCall(_)) => Node::CallTools,
            Some(ContentBlock::Text(_)) => Node::End,
            _ if last.kinds() == [BlockKind::Reasoning] => Node::CallModel,
            _ => Node::CallModel,
        }
    }
}
