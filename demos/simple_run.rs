//! Minimal single-turn run against a configured operator, printing the
//! streamed transcript as it arrives.
//!
//! Configure an operator via environment variables before running:
//!
//! ```text
//! OPERATOR_ACME_RUNTIME=openai_completion \
//! OPERATOR_ACME_ENDPOINT=https://api.openai.com/v1 \
//! OPERATOR_ACME_API_KEY=sk-... \
//! cargo run --example simple_run
//! ```

use agent_core::config::CoreConfig;
use agent_core::registry::{InMemoryModelRegistry, InMemoryObjectStore, InMemoryVectorStore};
use agent_core::store::InMemoryStore;
use agent_core::tools::{DefaultDispatcher, ToolRegistry};
use agent_core::transcript::ClientFrame;
use agent_core::{Client, RunRequest};
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env().unwrap_or_default();
    let operator_name = env::var("DEMO_OPERATOR").unwrap_or_else(|_| "acme".to_string());
    let model = env::var("DEMO_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

    let client = Client::new(
        config,
        Arc::new(config_operator_registry(&operator_name)),
        Arc::new(InMemoryModelRegistry::new()),
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryObjectStore::new()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(ToolRegistry::new(vec![])),
        Arc::new(DefaultDispatcher::new()),
    );

    let (tx, mut rx) = mpsc::channel::<ClientFrame>(32);
    let request = RunRequest {
        chat_id: 1,
        operator_name,
        model,
        message: "What's the capital of France?".to_string(),
        ..Default::default()
    };

    let printer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            print!("{}", frame.chunk);
            if frame.done {
                println!();
            }
        }
    });

    client.run(request, tx).await?;
    printer.await?;
    Ok(())
}

fn config_operator_registry(operator_name: &str) -> agent_core::registry::InMemoryOperatorRegistry {
    use agent_core::config::OperatorConfig;
    use agent_core::providers::Runtime;

    let registry = agent_core::registry::InMemoryOperatorRegistry::new();
    registry.insert(
        operator_name,
        OperatorConfig {
            runtime: Runtime::OpenAiCompletion,
            endpoint: env::var("DEMO_ENDPOINT").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("DEMO_API_KEY").unwrap_or_default(),
            org_id: None,
            project_id: None,
        },
    );
    registry
}
