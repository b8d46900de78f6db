//! # Agent Execution Core
//!
//! A streaming, tool-using reasoning loop that drives heterogeneous LLM
//! providers through a bounded `call_model`/`call_tools` graph.
//!
//! ## Overview
//!
//! This crate provides the orchestration layer for a multi-provider
//! conversational AI server: given an operator (provider account), a
//! model, and a turn's inputs, it assembles a prompt, drives the model
//! through zero or more tool calls under a recursion budget, and streams
//! the resulting transcript back to the caller while persisting it.
//!
//! ## Key Features
//!
//! - **Multi-Provider**: one adapter per [`providers::Runtime`] (OpenAI
//!   Responses/Completions, Anthropic, Gemini, xAI, OpenRouter) behind a
//!   single [`providers::ProviderAdapter`] trait
//! - **Bounded Tool Loop**: the [`graph::AgentGraph`] enforces a
//!   per-runtime tool-call limit and recursion budget so no run can spin
//!   forever
//! - **Streaming Transcript**: every model/tool content block is forwarded
//!   to the caller as it is produced and persisted through
//!   [`store::RelationalStore`]
//! - **Lifecycle Hooks**: intercept, block, or rewrite tool calls before
//!   and after they execute
//! - **Interrupts**: cancel an in-flight run from another task
//! - **Retry Logic**: exponential backoff with jitter for transient
//!   provider failures
//!
//! ## Example
//!
//! ```rust,no_run
//! use agent_core::{Client, RunRequest};
//! use agent_core::config::CoreConfig;
//! use agent_core::registry::{InMemoryModelRegistry, InMemoryObjectStore, InMemoryOperatorRegistry, InMemoryVectorStore};
//! use agent_core::store::InMemoryStore;
//! use agent_core::tools::{DefaultDispatcher, ToolRegistry};
//! use agent_core::transcript::ClientFrame;
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(
//!         CoreConfig::default(),
//!         Arc::new(InMemoryOperatorRegistry::new()),
//!         Arc::new(InMemoryModelRegistry::new()),
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(InMemoryObjectStore::new()),
//!         Arc::new(InMemoryVectorStore::new()),
//!         Arc::new(ToolRegistry::new(vec![])),
//!         Arc::new(DefaultDispatcher::new()),
//!     );
//!
//!     let (tx, mut rx) = mpsc::channel::<ClientFrame>(32);
//!     let request = RunRequest {
//!         chat_id: 1,
//!         operator_name: "acme".to_string(),
//!         model: "gpt-4o".to_string(),
//!         message: "What's the capital of France?".to_string(),
//!         ..Default::default()
//!     };
//!
//!     tokio::spawn(async move {
//!         while let Some(frame) = rx.recv().await {
//!             print!("{}", frame.chunk);
//!         }
//!     });
//!
//!     let _final_state = client.run(request, tx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **client**: top-level orchestrator wiring the prompt assembler, the
//!   agent graph, and the transcript writer into one request
//! - **graph**: the bounded `call_model`/`call_tools` state machine
//! - **prompt**: assembles the ordered message list a run starts from
//! - **providers**: one adapter per upstream LLM API
//! - **registry**: operator/model/tool/object/vector store contracts
//! - **store**: relational persistence for chat transcripts
//! - **transcript**: streams graph events into client-facing frames while
//!   persisting them
//! - **content_block**: the shared message/content-block model
//! - **tools**: tool definition, registration, and dispatch
//! - **hooks**: lifecycle event system for intercepting tool execution
//! - **config**: immutable runtime configuration
//! - **error**: the crate's error type and conversions
//! - **context**: token estimation and history truncation utilities
//! - **retry**: exponential backoff retry logic with jitter

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Top-level orchestrator: resolves the operator/model, assembles the
/// prompt, drives the agent graph, and streams the transcript for one run.
mod client;

/// Immutable runtime configuration: per-operator endpoints/credentials,
/// tool-call limits, and recursion budgets.
pub mod config;

/// Context window management utilities for token estimation and history truncation.
mod context;

/// The shared message/content-block model used by every provider adapter.
pub mod content_block;

/// Error types and conversions used across all public APIs.
mod error;

/// The bounded `call_model`/`call_tools` agent execution graph.
pub mod graph;

/// Lifecycle hooks system for intercepting and controlling tool execution.
mod hooks;

/// Assembles the ordered message list a run starts from.
pub mod prompt;

/// One provider adapter per upstream LLM API behind a shared trait.
pub mod providers;

/// Operator/model/tool/object/vector store lookup contracts.
pub mod registry;

/// Relational persistence for chat transcripts.
pub mod store;

/// Tool definition and execution system with automatic JSON schema generation.
pub mod tools;

/// Streams agent graph events into client-facing frames while persisting them.
pub mod transcript;

/// Core type definitions for agent configuration (legacy single-turn surface).
mod types;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

/// Retry utilities with exponential backoff and jitter.
pub mod retry;

// --- Core Client API ---

pub use client::{Client, RunRequest};

// --- Provider Configuration ---

pub use config::{CoreConfig, Provider, get_base_url, get_model};

// --- Context Management ---

pub use context::{estimate_tokens, is_approaching_limit, truncate_messages};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Lifecycle Hooks ---

pub use hooks::{
    HOOK_POST_TOOL_USE, HOOK_PRE_TOOL_USE, HOOK_USER_PROMPT_SUBMIT, HookDecision, Hooks,
    PostToolUseEvent, PreToolUseEvent, UserPromptSubmitEvent,
};

// --- Tool System ---

pub use tools::{Tool, ToolBuilder, tool};

// --- Content Block Model ---

pub use content_block::{AgentState, ContentBlock, Message, MessageRole};

// --- Core Types ---

pub use types::{AgentOptions, AgentOptionsBuilder, BaseUrl, ModelName, Temperature};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Convenience module containing the most commonly used types and functions.
/// Import with `use agent_core::prelude::*;` to get everything you need for typical usage.
pub mod prelude {
    pub use crate::{
        AgentOptions, AgentOptionsBuilder, Client, ContentBlock, Error, HookDecision, Hooks,
        Message, PostToolUseEvent, PreToolUseEvent, Result, RunRequest, Tool,
        UserPromptSubmitEvent, tool,
    };
}
