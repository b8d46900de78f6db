//! Adapter for xAI's Grok API.
//!
//! xAI's chat completions endpoint is wire-compatible with OpenAI
//! Completions, so this wraps
//! [`super::openai_completion::OpenAiCompletionAdapter`] rather than
//! re-implementing SSE parsing.

use super::openai_completion::OpenAiCompletionAdapter;
use super::{ContentBlockStream, ProviderAdapter, ReasoningEffort, Runtime, ToolDefinition};
use crate::content_block::Message;
use crate::Result;

pub struct XaiAdapter {
    inner: OpenAiCompletionAdapter,
}

impl XaiAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            inner: OpenAiCompletionAdapter::new(base_url, api_key, model).with_runtime(Runtime::Xai),
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for XaiAdapter {
    fn runtime(&self) -> Runtime {
        Runtime::Xai
    }

    fn bind_tools(&self, tools: Vec<ToolDefinition>) -> Box<dyn ProviderAdapter> {
        self.inner.bind_tools(tools)
    }

    async fn stream(&self, messages: &[Message], reasoning_effort: ReasoningEffort) -> Result<ContentBlockStream> {
        self.inner.stream(messages, reasoning_effort).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_xai_runtime_not_the_wrapped_adapters() {
        let adapter = XaiAdapter::new("http://localhost", "k", "grok-test");
        assert_eq!(adapter.runtime(), Runtime::Xai);
    }
}
