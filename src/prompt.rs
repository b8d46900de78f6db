//! Prompt Assembler: builds the initial ordered [`Message`] list for a new
//! agent run from inputs that live outside the core.
//!
//! Step ordering is contractual — see [`PromptAssembler::assemble`]. Empty
//! sections are elided but never reordered, and no step mutates its inputs.

use std::collections::HashMap;

use serde_json::Value;

use crate::content_block::{ContentBlock, ImageBlock, Message};
use crate::registry::{ObjectStore, VectorStore};
use crate::store::RelationalStore;
use crate::Result;

/// Fallback system prompt used when the caller configures none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Documents retrieved per knowledge-base injection.
const KNOWLEDGE_BASE_TOP_K: usize = 5;
const KNOWLEDGE_BASE_THRESHOLD: f32 = 0.3;

/// Inputs to a single prompt assembly, all owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct PromptInputs {
    pub user_name: String,
    pub system_prompt: Option<String>,
    pub long_term_memory: Vec<String>,
    pub short_term_memory: Vec<i64>,
    pub message: String,
    pub images: Vec<String>,
    pub knowledge_base: Option<String>,
    pub model_is_multimodal: bool,
}

/// Assembles the ordered message list the Agent Graph Engine starts from.
pub struct PromptAssembler<'a> {
    pub store: &'a dyn RelationalStore,
    pub object_store: &'a dyn ObjectStore,
    pub vector_store: &'a dyn VectorStore,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(
        store: &'a dyn RelationalStore,
        object_store: &'a dyn ObjectStore,
        vector_store: &'a dyn VectorStore,
    ) -> Self {
        Self {
            store,
            object_store,
            vector_store,
        }
    }

    /// Runs the fixed six-step assembly.
    pub async fn assemble(&self, inputs: &PromptInputs) -> Result<Vec<Message>> {
        let mut messages = Vec::new();

        // Step 1: system prompt.
        let system_prompt = inputs
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        messages.push(Message::system(system_prompt));

        // Step 2: long-term memory background, omitted if empty.
        if !inputs.long_term_memory.is_empty() {
            messages.push(Message::system(inputs.long_term_memory.join(";")));
        }

        // Step 3: short-term memory replay, in order.
        for chat_id in &inputs.short_term_memory {
            self.replay_turn(*chat_id, inputs.model_is_multimodal, &mut messages).await?;
        }

        // Step 4: current-turn multimodal attachments.
        if inputs.model_is_multimodal && !inputs.images.is_empty() {
            let mut blocks = Vec::with_capacity(inputs.images.len());
            for uri in &inputs.images {
                let bytes = self.object_store.download_to_memory(uri).await?;
                let mime_type = ImageBlock::mime_from_extension(uri);
                blocks.push(ContentBlock::Image(ImageBlock::new(mime_type, bytes)));
            }
            messages.push(Message::user_with_blocks(blocks));
        }

        // Step 5: knowledge-base injection.
        if let Some(collection) = inputs.knowledge_base.as_deref().filter(|c| !c.is_empty()) {
            let docs = self
                .vector_store
                .similarity_search(
                    collection,
                    &inputs.message,
                    KNOWLEDGE_BASE_TOP_K,
                    KNOWLEDGE_BASE_THRESHOLD,
                )
                .await?;
            if !docs.is_empty() {
                let body = docs
                    .iter()
                    .map(|d| d.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                messages.push(Message::system(format!("Knowledge Base Context:\n{body}")));
            }
        }

        // Step 6: current user message.
        messages.push(Message::user(inputs.message.clone()));

        Ok(messages)
    }

    /// Replays one persisted turn from `short_term_memory`. A missing
    /// `chat_id` silently contributes zero messages rather than erroring.
    async fn replay_turn(
        &self,
        chat_id: i64,
        model_is_multimodal: bool,
        messages: &mut Vec<Message>,
    ) -> Result<()> {
        let filter = chat_id_filter(chat_id);

        let user_input = self.store.read("user_input", &filter).await?;
        let Some(user_row) = user_input.into_iter().next() else {
            return Ok(());
        };
        let user_text = user_row.get("content").and_then(Value::as_str).unwrap_or_default();
        messages.push(Message::user(user_text));

        if model_is_multimodal {
            if let Some(images) = user_row.get("images").and_then(Value::as_array) {
                let mut blocks = Vec::new();
                for uri in images.iter().filter_map(Value::as_str) {
                    let bytes = self.object_store.download_to_memory(uri).await?;
                    let mime_type = ImageBlock::mime_from_extension(uri);
                    blocks.push(ContentBlock::Image(ImageBlock::new(mime_type, bytes)));
                }
                if !blocks.is_empty() {
                    messages.push(Message::user_with_blocks(blocks));
                }
            }
        }

        let mut assistant_blocks = Vec::new();
        let reasoning_rows = self.store.read("ai_reasoning", &filter).await?;
        if let Some(reasoning_row) = reasoning_rows.into_iter().next() {
            if let Some(text) = reasoning_row.get("content").and_then(Value::as_str) {
                assistant_blocks.push(ContentBlock::reasoning(text));
            }
        }

        let response_rows = self.store.read("ai_response", &filter).await?;
        if let Some(response_row) = response_rows.into_iter().next() {
            if let Some(text) = response_row.get("content").and_then(Value::as_str) {
                assistant_blocks.push(ContentBlock::text(text));
            }
        }

        if !assistant_blocks.is_empty() {
            messages.push(Message::assistant(assistant_blocks));
        }

        Ok(())
    }
}

fn chat_id_filter(chat_id: i64) -> HashMap<String, Value> {
    let mut filter = HashMap::new();
    filter.insert("chat_id".to_string(), Value::from(chat_id));
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_block::MessageRole;
    use crate::registry::{InMemoryObjectStore, InMemoryVectorStore};
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn assembler<'a>(
        store: &'a InMemoryStore,
        objects: &'a InMemoryObjectStore,
        vectors: &'a InMemoryVectorStore,
    ) -> PromptAssembler<'a> {
        PromptAssembler::new(store, objects, vectors)
    }

    #[tokio::test]
    async fn minimal_inputs_produce_system_then_user() {
        let store = InMemoryStore::new();
        let objects = InMemoryObjectStore::new();
        let vectors = InMemoryVectorStore::new();
        let assembler = assembler(&store, &objects, &vectors);

        let inputs = PromptInputs {
            message: "hello".to_string(),
            ..Default::default()
        };

        let messages = assembler.assemble(&inputs).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
    }

    #[tokio::test]
    async fn long_term_memory_joined_by_semicolon() {
        let store = InMemoryStore::new();
        let objects = InMemoryObjectStore::new();
        let vectors = InMemoryVectorStore::new();
        let assembler = assembler(&store, &objects, &vectors);

        let inputs = PromptInputs {
            long_term_memory: vec!["likes rust".to_string(), "prefers terse answers".to_string()],
            message: "hi".to_string(),
            ..Default::default()
        };

        let messages = assembler.assemble(&inputs).await.unwrap();
        let background = match &messages[1].content[0] {
            ContentBlock::Text(t) => &t.text,
            _ => panic!("expected text block"),
        };
        assert_eq!(background, "likes rust;prefers terse answers");
    }

    #[tokio::test]
    async fn missing_chat_id_contributes_zero_messages() {
        let store = InMemoryStore::new();
        let objects = InMemoryObjectStore::new();
        let vectors = InMemoryVectorStore::new();
        let assembler = assembler(&store, &objects, &vectors);

        let inputs = PromptInputs {
            short_term_memory: vec![999],
            message: "hi".to_string(),
            ..Default::default()
        };

        let messages = assembler.assemble(&inputs).await.unwrap();
        // Only the default system prompt + final user message.
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn short_term_memory_replays_user_reasoning_and_text_in_order() {
        let store = InMemoryStore::new();
        let objects = InMemoryObjectStore::new();
        let vectors = InMemoryVectorStore::new();

        let mut row = HashMap::new();
        row.insert("chat_id".to_string(), json!(1));
        row.insert("content".to_string(), json!("what's 2+2?"));
        store.insert("user_input", row).await.unwrap();

        let mut reasoning_row = HashMap::new();
        reasoning_row.insert("chat_id".to_string(), json!(1));
        reasoning_row.insert("content".to_string(), json!("basic arithmetic"));
        store.insert("ai_reasoning", reasoning_row).await.unwrap();

        let mut response_row = HashMap::new();
        response_row.insert("chat_id".to_string(), json!(1));
        response_row.insert("content".to_string(), json!("4"));
        store.insert("ai_response", response_row).await.unwrap();

        let assembler = assembler(&store, &objects, &vectors);
        let inputs = PromptInputs {
            short_term_memory: vec![1],
            message: "and 3+3?".to_string(),
            ..Default::default()
        };

        let messages = assembler.assemble(&inputs).await.unwrap();
        // system, replayed user, replayed assistant (reasoning+text), final user
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[2].content.len(), 2);
        assert!(matches!(messages[2].content[0], ContentBlock::Reasoning(_)));
        assert!(matches!(messages[2].content[1], ContentBlock::Text(_)));
    }

    #[tokio::test]
    async fn knowledge_base_injection_formats_context_block() {
        let store = InMemoryStore::new();
        let objects = InMemoryObjectStore::new();
        let vectors = InMemoryVectorStore::new();
        vectors.seed(
            "docs",
            vec![crate::registry::Document {
                content: "Rust is a systems language.".to_string(),
                score: 0.9,
                metadata: json!({}),
            }],
        );

        let assembler = assembler(&store, &objects, &vectors);
        let inputs = PromptInputs {
            knowledge_base: Some("docs".to_string()),
            message: "what is rust?".to_string(),
            ..Default::default()
        };

        let messages = assembler.assemble(&inputs).await.unwrap();
        let kb_message = &messages[messages.len() - 2];
        match &kb_message.content[0] {
            ContentBlock::Text(t) => assert!(t.text.starts_with("Knowledge Base Context:\n")),
            _ => panic!("expected text block"),
        }
    }

    #[tokio::test]
    async fn multimodal_attachments_downloaded_and_mime_typed() {
        let store = InMemoryStore::new();
        let objects = InMemoryObjectStore::new();
        let vectors = InMemoryVectorStore::new();
        objects.seed("s3://bucket/cat.png", vec![1, 2, 3]);

        let assembler = assembler(&store, &objects, &vectors);
        let inputs = PromptInputs {
            images: vec!["s3://bucket/cat.png".to_string()],
            model_is_multimodal: true,
            message: "what's in this image?".to_string(),
            ..Default::default()
        };

        let messages = assembler.assemble(&inputs).await.unwrap();
        let image_message = &messages[messages.len() - 2];
        match &image_message.content[0] {
            ContentBlock::Image(img) => {
                assert_eq!(img.mime_type, "image/png");
                assert_eq!(img.base64, vec![1, 2, 3]);
            }
            _ => panic!("expected image block"),
        }
    }

    #[tokio::test]
    async fn non_multimodal_model_skips_attachments() {
        let store = InMemoryStore::new();
        let objects = InMemoryObjectStore::new();
        let vectors = InMemoryVectorStore::new();

        let assembler = assembler(&store, &objects, &vectors);
        let inputs = PromptInputs {
            images: vec!["s3://bucket/cat.png".to_string()],
            model_is_multimodal: false,
            message: "describe it".to_string(),
            ..Default::default()
        };

        let messages = assembler.assemble(&inputs).await.unwrap();
        assert_eq!(messages.len(), 2);
    }
}
