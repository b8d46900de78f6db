//! Attaches a PreToolUse hook that blocks destructive tool calls before
//! they ever reach the dispatcher.

use agent_core::config::{CoreConfig, OperatorConfig};
use agent_core::providers::Runtime;
use agent_core::registry::{InMemoryModelRegistry, InMemoryObjectStore, InMemoryOperatorRegistry, InMemoryVectorStore};
use agent_core::store::InMemoryStore;
use agent_core::tool;
use agent_core::tools::{DefaultDispatcher, ToolRegistry};
use agent_core::transcript::ClientFrame;
use agent_core::{Client, HookDecision, Hooks, RunRequest};
use serde_json::json;
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let delete_file = tool("delete_file", "Deletes a file from disk")
        .param("path", "string")
        .build(|_args| async move { Ok(json!({"deleted": true})) });

    let hooks = Hooks::new().add_pre_tool_use(|event| async move {
        if event.tool_name == "delete_file" {
            return Some(HookDecision::block(
                "destructive filesystem operations require human approval",
            ));
        }
        None
    });

    let operator_registry = InMemoryOperatorRegistry::new();
    operator_registry.insert(
        "acme",
        OperatorConfig {
            runtime: Runtime::OpenAiCompletion,
            endpoint: env::var("DEMO_ENDPOINT").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("DEMO_API_KEY").unwrap_or_default(),
            org_id: None,
            project_id: None,
        },
    );

    let client = Client::new(
        CoreConfig::default(),
        Arc::new(operator_registry),
        Arc::new(InMemoryModelRegistry::new()),
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryObjectStore::new()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(ToolRegistry::new(vec![delete_file])),
        Arc::new(DefaultDispatcher::new()),
    )
    .with_hooks(hooks);

    let (tx, mut rx) = mpsc::channel::<ClientFrame>(32);
    let request = RunRequest {
        chat_id: 1,
        operator_name: "acme".to_string(),
        model: "gpt-4o-mini".to_string(),
        message: "Please delete /etc/passwd".to_string(),
        ..Default::default()
    };

    let printer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            print!("{}", frame.chunk);
        }
    });

    client.run(request, tx).await?;
    printer.await?;
    Ok(())
}
