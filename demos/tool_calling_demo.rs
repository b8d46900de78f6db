//! Registers a calculator tool and runs a request through a live operator,
//! letting the model decide whether to invoke it.

use agent_core::config::{CoreConfig, OperatorConfig};
use agent_core::providers::Runtime;
use agent_core::registry::{InMemoryModelRegistry, InMemoryObjectStore, InMemoryOperatorRegistry, InMemoryVectorStore};
use agent_core::store::InMemoryStore;
use agent_core::tool;
use agent_core::tools::{DefaultDispatcher, ToolRegistry};
use agent_core::transcript::ClientFrame;
use agent_core::{Client, RunRequest};
use serde_json::json;
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let calculator = tool("calculator", "Performs basic arithmetic")
        .param("operation", "string")
        .param("a", "number")
        .param("b", "number")
        .build(|args| async move {
            let op = args["operation"].as_str().unwrap_or("add");
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            let result = match op {
                "add" => a + b,
                "subtract" => a - b,
                "multiply" => a * b,
                "divide" => a / b,
                other => return Err(agent_core::Error::tool(format!("unknown operation: {other}"))),
            };
            Ok(json!({"result": result}))
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
        Arc::new(ToolRegistry::new(vec![calculator])),
        Arc::new(DefaultDispatcher::new()),
    );

    let (tx, mut rx) = mpsc::channel::<ClientFrame>(32);
    let request = RunRequest {
        chat_id: 1,
        operator_name: "acme".to_string(),
        model: "gpt-4o-mini".to_string(),
        message: "What's 124 times 38?".to_string(),
        ..Default::default()
    };

    let printer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            println!("{:?}: {}", frame.frame_type, frame.chunk);
        }
    });

    client.run(request, tx).await?;
    printer.await?;
    Ok(())
}
