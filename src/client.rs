//! Top-level orchestrator: resolves the operator and model, assembles the
//! prompt, drives the bounded Agent Graph Engine, and streams the
//! transcript for one request.
//!
//! Interrupting a run sets an `Arc<AtomicBool>` flag; auto-execution and
//! hook wiring live in [`crate::graph::AgentGraph`] rather than here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::CoreConfig;
use crate::content_block::AgentState;
use crate::graph::AgentGraph;
use crate::hooks::{Hooks, UserPromptSubmitEvent};
use crate::prompt::{PromptAssembler, PromptInputs};
use crate::providers::{
    AnthropicAdapter, GeminiAdapter, OpenAiCompletionAdapter, OpenAiResponsesAdapter,
    OpenRouterAdapter, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition, XaiAdapter,
};
use crate::registry::{ModelRegistry, ObjectStore, OperatorRegistry, VectorStore};
use crate::store::RelationalStore;
use crate::tools::{Dispatcher, ToolRegistry};
use crate::transcript::{ClientFrame, TranscriptWriter};
use crate::{Error, Result};

/// Everything a single run needs beyond the long-lived [`Client`]: which
/// operator/model to speak to, and the turn's inputs to the Prompt
/// Assembler.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub chat_id: i64,
    pub operator_name: String,
    pub model: String,
    pub user_name: String,
    pub system_prompt: Option<String>,
    pub long_term_memory: Vec<String>,
    pub short_term_memory: Vec<i64>,
    pub message: String,
    pub images: Vec<String>,
    pub knowledge_base: Option<String>,
}

/// Wires the agent execution core's collaborators and drives complete
/// requests end to end. Built once and reused across requests — every
/// field is either `Arc`'d or cheap, immutable configuration.
pub struct Client {
    config: CoreConfig,
    operator_registry: Arc<dyn OperatorRegistry>,
    model_registry: Arc<dyn ModelRegistry>,
    store: Arc<dyn RelationalStore>,
    object_store: Arc<dyn ObjectStore>,
    vector_store: Arc<dyn VectorStore>,
    tool_registry: Arc<ToolRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
    hooks: Hooks,
    interrupted: Arc<AtomicBool>,
}

impl Client {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoreConfig,
        operator_registry: Arc<dyn OperatorRegistry>,
        model_registry: Arc<dyn ModelRegistry>,
        store: Arc<dyn RelationalStore>,
        object_store: Arc<dyn ObjectStore>,
        vector_store: Arc<dyn VectorStore>,
        tool_registry: Arc<ToolRegistry>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            config,
            operator_registry,
            model_registry,
            store,
            object_store,
            vector_store,
            tool_registry,
            dispatcher,
            hooks: Hooks::new(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attaches lifecycle hooks fired around every tool invocation made by
    /// the Agent Graph Engine.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Requests that the in-flight run stop as soon as possible. Since the
    /// graph runs as a spawned task, the flag is enforced by a watcher
    /// task aborting that task rather than a loop-local check.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn reset_interrupt(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    /// Resolves the `operator_name`/`model` pair to a bound provider
    /// adapter. One adapter type per [`Runtime`]; all six share the same
    /// `(base_url, api_key, model)` constructor shape.
    async fn build_adapter(
        &self,
        operator_name: &str,
        model: &str,
    ) -> Result<(Box<dyn ProviderAdapter>, Runtime)> {
        let operator = self
            .operator_registry
            .get(operator_name)
            .await?
            .ok_or_else(|| Error::config(format!("unknown operator: {operator_name}")))?;

        let adapter: Box<dyn ProviderAdapter> = match operator.runtime {
            Runtime::OpenAiResponses => {
                Box::new(OpenAiResponsesAdapter::new(operator.endpoint, operator.api_key, model))
            }
            Runtime::OpenAiCompletion => {
                Box::new(OpenAiCompletionAdapter::new(operator.endpoint, operator.api_key, model))
            }
            Runtime::Anthropic => {
                Box::new(AnthropicAdapter::new(operator.endpoint, operator.api_key, model))
            }
            Runtime::Gemini => Box::new(GeminiAdapter::new(operator.endpoint, operator.api_key, model)),
            Runtime::Xai => Box::new(XaiAdapter::new(operator.endpoint, operator.api_key, model)),
            Runtime::OpenRouter => {
                Box::new(OpenRouterAdapter::new(operator.endpoint, operator.api_key, model))
            }
        };

        Ok((adapter, operator.runtime))
    }

    /// Runs one complete request: assembles the prompt, drives the graph,
    /// and streams [`ClientFrame`]s over `frames` until the run ends.
    /// Returns the final [`AgentState`].
    pub async fn run(&self, request: RunRequest, frames: mpsc::Sender<ClientFrame>) -> Result<AgentState> {
        self.reset_interrupt();

        let model_record = self.model_registry.get(&request.model).await?;
        let multimodal = model_record.as_ref().map(|m| m.multimodal).unwrap_or(false);
        let reasoning_effort = model_record
            .map(|m| m.reasoning_effort)
            .unwrap_or(ReasoningEffort::Off);

        let history_snapshot: Vec<serde_json::Value> =
            request.short_term_memory.iter().map(|id| serde_json::json!({"message_id": id})).collect();
        let mut message = request.message;
        let prompt_event = UserPromptSubmitEvent::new(message.clone(), history_snapshot);
        if let Some(decision) = self.hooks.execute_user_prompt_submit(prompt_event).await {
            if let Some(modified) = decision.modified_prompt {
                message = modified;
            }
        }

        let prompt_inputs = PromptInputs {
            user_name: request.user_name,
            system_prompt: request.system_prompt,
            long_term_memory: request.long_term_memory,
            short_term_memory: request.short_term_memory,
            message,
            images: request.images,
            knowledge_base: request.knowledge_base,
            model_is_multimodal: multimodal,
        };

        let assembler = PromptAssembler::new(
            self.store.as_ref(),
            self.object_store.as_ref(),
            self.vector_store.as_ref(),
        );
        let initial_messages = assembler.assemble(&prompt_inputs).await?;

        let (adapter, runtime) = self.build_adapter(&request.operator_name, &request.model).await?;
        let tool_defs: Vec<ToolDefinition> = self
            .tool_registry
            .builtin_tools()
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                schema: t.input_schema().clone(),
            })
            .collect();
        let bound_adapter: Arc<dyn ProviderAdapter> = Arc::from(adapter.bind_tools(tool_defs));

        let tool_call_limit = self.config.tool_call_limit_for(runtime);
        let recursion_budget = self.config.recursion_budget_for(runtime) as usize;

        let graph = AgentGraph::new(
            bound_adapter,
            self.tool_registry.clone(),
            self.dispatcher.clone(),
            tool_call_limit,
            recursion_budget,
        )
        .with_hooks(self.hooks.clone())
        .with_reasoning_effort(reasoning_effort);

        let (event_tx, event_rx) = mpsc::channel(64);
        let writer = TranscriptWriter::new(self.store.as_ref(), request.chat_id, self.config.transcript_truncate_len);

        let graph_task = tokio::spawn(async move { graph.run(initial_messages, event_tx).await });
        let abort_handle = graph_task.abort_handle();
        let interrupted = self.interrupted.clone();
        let watcher = tokio::spawn(async move {
            while !abort_handle.is_finished() {
                if interrupted.load(Ordering::SeqCst) {
                    abort_handle.abort();
                    return;
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        });

        writer.run(event_rx, frames).await;
        watcher.abort();

        match graph_task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::cancelled()),
            Err(e) => Err(Error::other(format!("graph task panicked: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorConfig;
    use crate::content_block::{ContentBlock, Message, MessageRole};
    use crate::providers::ContentBlockStream;
    use crate::registry::{
        InMemoryModelRegistry, InMemoryObjectStore, InMemoryOperatorRegistry, InMemoryVectorStore,
        ModelRecord,
    };
    use crate::store::InMemoryStore;
    use crate::tools::DefaultDispatcher;
    use async_trait::async_trait;
    use futures::stream;

    struct EchoAdapter;

    #[async_trait]
    impl ProviderAdapter for EchoAdapter {
        fn runtime(&self) -> Runtime {
            Runtime::OpenAiCompletion
        }

        fn bind_tools(&self, _tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter> {
            Box::new(EchoAdapter)
        }

        async fn stream(&self, _messages: &[Message], _effort: ReasoningEffort) -> Result<ContentBlockStream> {
            Ok(Box::pin(stream::iter(vec![Ok(ContentBlock::text("ok"))])))
        }
    }

    fn operator_registry_with_acme() -> Arc<InMemoryOperatorRegistry> {
        let registry = InMemoryOperatorRegistry::new();
        registry.insert(
            "acme",
            OperatorConfig {
                runtime: Runtime::OpenAiCompletion,
                endpoint: "http://localhost:1".to_string(),
                api_key: "sk-test".to_string(),
                org_id: None,
                project_id: None,
            },
        );
        Arc::new(registry)
    }

    fn test_client() -> Client {
        Client::new(
            CoreConfig::default(),
            operator_registry_with_acme(),
            Arc::new(InMemoryModelRegistry::new()),
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(ToolRegistry::new(vec![])),
            Arc::new(DefaultDispatcher::new()),
        )
    }

    #[tokio::test]
    async fn unknown_operator_is_a_config_error() {
        let client = test_client();
        let (tx, _rx) = mpsc::channel(8);
        let request = RunRequest {
            chat_id: 1,
            operator_name: "does-not-exist".to_string(),
            model: "gpt-4o".to_string(),
            message: "hi".to_string(),
            ..Default::default()
        };
        let result = client.run(request, tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn model_registry_miss_defaults_to_non_multimodal_and_no_reasoning() {
        let registry = InMemoryModelRegistry::new();
        registry.insert(
            "gpt-4o",
            ModelRecord {
                multimodal: true,
                reasoning_effort: ReasoningEffort::Medium,
            },
        );
        assert!(registry.get("gpt-4o").await.unwrap().unwrap().multimodal);
        assert!(registry.get("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn interrupt_resets_between_runs() {
        let client = test_client();
        client.interrupt();
        assert!(client.is_interrupted());
        client.reset_interrupt();
        assert!(!client.is_interrupted());
    }

    #[tokio::test]
    async fn user_prompt_submit_hook_can_rewrite_the_message() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let hooks = Hooks::new().add_user_prompt_submit(move |event| {
            let seen = seen_clone.clone();
            async move {
                seen.lock().unwrap().push(event.prompt.clone());
                Some(crate::hooks::HookDecision::modify_prompt(
                    "rewritten by hook",
                    "redacted secret",
                ))
            }
        });

        let client = Client::new(
            CoreConfig::default(),
            operator_registry_with_acme(),
            Arc::new(InMemoryModelRegistry::new()),
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(ToolRegistry::new(vec![])),
            Arc::new(DefaultDispatcher::new()),
        )
        .with_hooks(hooks);

        // The operator dial still fails (no live endpoint), but the hook
        // runs before that point, so its side effect is observable either way.
        let (tx, _rx) = mpsc::channel(8);
        let request = RunRequest {
            chat_id: 1,
            operator_name: "does-not-exist".to_string(),
            model: "gpt-4o".to_string(),
            message: "original secret".to_string(),
            ..Default::default()
        };
        let _ = client.run(request, tx).await;

        assert_eq!(seen.lock().unwrap().as_slice(), ["original secret"]);
    }

    #[tokio::test]
    async fn full_request_with_echo_adapter_reaches_done() {
        let store = Arc::new(InMemoryStore::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let vectors = Arc::new(InMemoryVectorStore::new());

        // Exercises prompt assembly + transcript writing directly against
        // a stub adapter, bypassing `Client::build_adapter`'s HTTP dial.
        let assembler = PromptAssembler::new(store.as_ref(), objects.as_ref(), vectors.as_ref());
        let inputs = PromptInputs {
            message: "hello".to_string(),
            ..Default::default()
        };
        let messages = assembler.assemble(&inputs).await.unwrap();

        let graph = AgentGraph::new(
            Arc::new(EchoAdapter),
            Arc::new(ToolRegistry::new(vec![])),
            Arc::new(DefaultDispatcher::new()),
            10,
            22,
        );
        let (tx, rx) = mpsc::channel(16);
        let (frames_tx, mut frames_rx) = mpsc::channel(16);
        let writer = TranscriptWriter::new(store.as_ref(), 1, 10_240);

        let graph_task = tokio::spawn(async move { graph.run(messages, tx).await });
        writer.run(rx, frames_tx).await;
        let state = graph_task.await.unwrap().unwrap();

        assert_eq!(state.last().unwrap().role, MessageRole::Assistant);
        let mut saw_done = false;
        while let Some(frame) = frames_rx.recv().await {
            if frame.done {
                saw_done = true;
            }
        }
        assert!(saw_done);
    }
}
