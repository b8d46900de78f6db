//! Adapter for OpenRouter's unified multi-model gateway.
//!
//! OpenRouter proxies dozens of upstream models behind a single
//! OpenAI-Completions-compatible endpoint, so this
//! wraps [`super::openai_completion::OpenAiCompletionAdapter`] the same
//! way [`super::xai::XaiAdapter`] does.

use super::openai_completion::OpenAiCompletionAdapter;
use super::{ContentBlockStream, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition};
use crate::content_block::Message;
use crate::Result;

pub struct OpenRouterAdapter {
    inner: OpenAiCompletionAdapter,
}

impl OpenRouterAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            inner: OpenAiCompletionAdapter::new(base_url, api_key, model).with_runtime(Runtime::OpenRouter),
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenRouterAdapter {
    fn runtime(&self) -> Runtime {
        Runtime::OpenRouter
    }

    fn bind_tools(&self, tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter> {
        self.inner.bind_tools(tools)
    }

    async fn stream(&self, messages: &[Message], reasoning_effort: ReasoningEffort) -> Result<ContentBlockStream> {
        self.inner.stream(messages, reasoning_effort).await
    }
}
