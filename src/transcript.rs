//! Streaming Transcript Writer: fans each [`GraphEvent`] out to a client
//! frame stream and a best-effort persisted transcript.
//!
//! Two responsibilities, both driven off the same event:
//!
//! - **Client frames**: one [`ClientFrame`] per [`GraphEvent::ModelBlock`] /
//!   [`GraphEvent::ToolResult`], terminated by a `done: true` frame carrying
//!   the chat id. Frame `type` fields use their own wire names, distinct
//!   from [`crate::content_block::BlockKind`]'s Rust-facing names.
//! - **Persistence**: best-effort [`RelationalStore`] writes. A failed write
//!   is logged and swallowed — it must never corrupt or halt the client
//!   stream (mirrors [`crate::Error::PersistenceFailed`]'s non-terminal
//!   classification).
//!
//! Segmentation rule: consecutive `output_text` (or `reasoning_summary`)
//! blocks accumulate into a single buffer and flush as one row when the
//! block type changes or the run ends; `tool_calls` and `tool_output`
//! blocks are never buffered and are written immediately, keyed by
//! `call_id`. Persisted bodies are truncated to `truncate_len` chars, a
//! boundary this module owns — the graph engine never truncates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::content_block::{BlockKind, ContentBlock};
use crate::graph::GraphEvent;
use crate::store::RelationalStore;

/// One frame of the client-facing wire protocol.
///
/// ```json
/// {"chunk": "...text so far...", "type": "output_text", "done": false}
/// {"chunk": "42", "done": true}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    pub chunk: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<String>,
    pub done: bool,
}

impl ClientFrame {
    fn chunk(chunk: impl Into<String>, frame_type: &'static str) -> Self {
        Self {
            chunk: chunk.into(),
            frame_type: Some(frame_type.to_string()),
            done: false,
        }
    }

    fn done(chat_id: i64) -> Self {
        Self {
            chunk: chat_id.to_string(),
            frame_type: None,
            done: true,
        }
    }
}

/// Wire name for a block kind, distinct from [`BlockKind`]'s own naming.
fn wire_name(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Text => "output_text",
        BlockKind::Reasoning => "reasoning_summary",
        BlockKind::ToolCall => "tool_calls",
        BlockKind::ToolOutput => "tool_output",
        BlockKind::Image => "image",
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    text.chars().take(max_len).collect()
}

/// Accumulated, not-yet-flushed run of same-kind blocks.
struct PendingRun {
    kind: BlockKind,
    buffer: String,
}

/// Consumes one run's [`GraphEvent`]s and produces [`ClientFrame`]s plus
/// best-effort persisted rows.
pub struct TranscriptWriter<'a> {
    store: &'a dyn RelationalStore,
    chat_id: i64,
    truncate_len: usize,
}

impl<'a> TranscriptWriter<'a> {
    pub fn new(store: &'a dyn RelationalStore, chat_id: i64, truncate_len: usize) -> Self {
        Self {
            store,
            chat_id,
            truncate_len,
        }
    }

    /// Drains `events` to completion, sending a [`ClientFrame`] for every
    /// model block and tool result, and persisting as it goes. Returns once
    /// the event channel closes (after [`GraphEvent::Done`] is observed) or
    /// the frame channel is dropped by the client.
    pub async fn run(&self, mut events: mpsc::Receiver<GraphEvent>, frames: mpsc::Sender<ClientFrame>) {
        let mut pending: Option<PendingRun> = None;

        while let Some(event) = events.recv().await {
            match event {
                GraphEvent::ModelBlock(block) => {
                    self.handle_model_block(block, &mut pending, &frames).await;
                }
                GraphEvent::ToolResult(block) => {
                    self.flush(&mut pending).await;
                    self.handle_tool_result(block, &frames).await;
                }
                GraphEvent::Failed(reason) => {
                    log::warn!("agent run failed for chat {}: {reason}", self.chat_id);
                    self.flush(&mut pending).await;
                }
                GraphEvent::Done => {
                    self.flush(&mut pending).await;
                    let _ = frames.send(ClientFrame::done(self.chat_id)).await;
                    return;
                }
            }
        }

        // Event channel closed without a Done (producer dropped early).
        self.flush(&mut pending).await;
    }

    async fn handle_model_block(
        &self,
        block: ContentBlock,
        pending: &mut Option<PendingRun>,
        frames: &mpsc::Sender<ClientFrame>,
    ) {
        match block {
            ContentBlock::Text(text) => {
                self.accumulate(pending, BlockKind::Text, text.text, frames).await;
            }
            ContentBlock::Reasoning(reasoning) => {
                self.accumulate(pending, BlockKind::Reasoning, reasoning.reasoning, frames)
                    .await;
            }
            ContentBlock::ToolCall(call) => {
                self.flush(pending).await;
                let _ = frames
                    .send(ClientFrame::chunk(call.name.clone(), wire_name(BlockKind::ToolCall)))
                    .await;
                let mut row = HashMap::new();
                row.insert("chat_id".to_string(), Value::from(self.chat_id));
                row.insert("call_id".to_string(), Value::from(call.id.clone()));
                row.insert("tool_name".to_string(), Value::from(call.name.clone()));
                row.insert("arguments".to_string(), Value::Object(call.args));
                self.persist("tool_call", row, &call.id).await;
            }
            ContentBlock::ToolOutput(_) | ContentBlock::Image(_) => {
                // Not produced by call_model in this engine; nothing to segment.
                self.flush(pending).await;
            }
        }
    }

    async fn handle_tool_result(&self, block: ContentBlock, frames: &mpsc::Sender<ClientFrame>) {
        let ContentBlock::ToolOutput(output) = block else {
            return;
        };

        let truncated = truncate(&output.content, self.truncate_len);
        let _ = frames
            .send(ClientFrame::chunk(truncated.clone(), wire_name(BlockKind::ToolOutput)))
            .await;

        let mut row = HashMap::new();
        row.insert("chat_id".to_string(), Value::from(self.chat_id));
        row.insert("call_id".to_string(), Value::from(output.call_id.clone()));
        row.insert("content".to_string(), Value::from(truncated));
        self.persist("tool_output", row, &output.call_id).await;
    }

    async fn accumulate(
        &self,
        pending: &mut Option<PendingRun>,
        kind: BlockKind,
        text: String,
        frames: &mpsc::Sender<ClientFrame>,
    ) {
        let _ = frames.send(ClientFrame::chunk(text.clone(), wire_name(kind))).await;

        match pending {
            Some(run) if run.kind == kind => run.buffer.push_str(&text),
            _ => {
                self.flush(pending).await;
                *pending = Some(PendingRun { kind, buffer: text });
            }
        }
    }

    async fn flush(&self, pending: &mut Option<PendingRun>) {
        let Some(run) = pending.take() else { return };
        if run.buffer.is_empty() {
            return;
        }
        let content = truncate(&run.buffer, self.truncate_len);

        let mut row = HashMap::new();
        row.insert("chat_id".to_string(), Value::from(self.chat_id));
        row.insert("content".to_string(), Value::from(content));

        let table = match run.kind {
            BlockKind::Text => "ai_response",
            BlockKind::Reasoning => "ai_reasoning",
            _ => return,
        };
        self.persist(table, row, "").await;
    }

    async fn persist(&self, table: &str, row: HashMap<String, Value>, key: &str) {
        if let Err(e) = self.store.insert(table, row).await {
            log::warn!("transcript write to `{table}` failed for chat {} key `{key}`: {e}", self.chat_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use tokio::sync::mpsc;

    async fn drain_frames(mut rx: mpsc::Receiver<ClientFrame>) -> Vec<ClientFrame> {
        let mut out = Vec::new();
        while let Some(f) = rx.recv().await {
            out.push(f);
        }
        out
    }

    #[tokio::test]
    async fn consecutive_text_blocks_accumulate_into_one_row() {
        let store = InMemoryStore::new();
        let writer = TranscriptWriter::new(&store, 7, 10_240);

        let (etx, erx) = mpsc::channel(16);
        let (ftx, frx) = mpsc::channel(16);

        etx.send(GraphEvent::ModelBlock(ContentBlock::text("Hello, ")))
            .await
            .unwrap();
        etx.send(GraphEvent::ModelBlock(ContentBlock::text("world.")))
            .await
            .unwrap();
        etx.send(GraphEvent::Done).await.unwrap();
        drop(etx);

        writer.run(erx, ftx).await;
        let frames = drain_frames(frx).await;
        assert!(frames.last().unwrap().done);

        let rows = store.read("ai_response", &HashMap::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["content"], Value::from("Hello, world."));
    }

    #[tokio::test]
    async fn type_change_flushes_previous_run_as_separate_row() {
        let store = InMemoryStore::new();
        let writer = TranscriptWriter::new(&store, 1, 10_240);

        let (etx, erx) = mpsc::channel(16);
        let (ftx, frx) = mpsc::channel(16);

        etx.send(GraphEvent::ModelBlock(ContentBlock::reasoning("thinking")))
            .await
            .unwrap();
        etx.send(GraphEvent::ModelBlock(ContentBlock::text("answer")))
            .await
            .unwrap();
        etx.send(GraphEvent::Done).await.unwrap();
        drop(etx);

        writer.run(erx, ftx).await;
        drop(frx);

        let reasoning = store.read("ai_reasoning", &HashMap::new()).await.unwrap();
        let response = store.read("ai_response", &HashMap::new()).await.unwrap();
        assert_eq!(reasoning.len(), 1);
        assert_eq!(response.len(), 1);
        assert_eq!(reasoning[0]["content"], Value::from("thinking"));
        assert_eq!(response[0]["content"], Value::from("answer"));
    }

    #[tokio::test]
    async fn tool_call_and_output_write_immediately_keyed_by_call_id() {
        let store = InMemoryStore::new();
        let writer = TranscriptWriter::new(&store, 3, 10_240);

        let (etx, erx) = mpsc::channel(16);
        let (ftx, frx) = mpsc::channel(16);

        let mut args = serde_json::Map::new();
        args.insert("q".into(), serde_json::json!("rust"));
        etx.send(GraphEvent::ModelBlock(ContentBlock::tool_call("call_1", "search", args)))
            .await
            .unwrap();
        etx.send(GraphEvent::ToolResult(ContentBlock::tool_output("call_1", "no results")))
            .await
            .unwrap();
        etx.send(GraphEvent::Done).await.unwrap();
        drop(etx);

        writer.run(erx, ftx).await;
        drop(frx);

        let calls = store.read("tool_call", &HashMap::new()).await.unwrap();
        let outputs = store.read("tool_output", &HashMap::new()).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["call_id"], Value::from("call_1"));
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0]["content"], Value::from("no results"));
    }

    #[tokio::test]
    async fn long_text_is_truncated_to_configured_length() {
        let store = InMemoryStore::new();
        let writer = TranscriptWriter::new(&store, 1, 5);

        let (etx, erx) = mpsc::channel(16);
        let (ftx, frx) = mpsc::channel(16);

        etx.send(GraphEvent::ModelBlock(ContentBlock::text("abcdefghij")))
            .await
            .unwrap();
        etx.send(GraphEvent::Done).await.unwrap();
        drop(etx);

        writer.run(erx, ftx).await;
        drop(frx);

        let rows = store.read("ai_response", &HashMap::new()).await.unwrap();
        assert_eq!(rows[0]["content"], Value::from("abcde"));
    }

    #[tokio::test]
    async fn persistence_failure_does_not_halt_the_client_stream() {
        struct FailingStore;
        #[async_trait::async_trait]
        impl RelationalStore for FailingStore {
            async fn insert(&self, _table: &str, _row: HashMap<String, Value>) -> crate::Result<()> {
                Err(crate::Error::persistence_failed("disk full"))
            }
            async fn read(
                &self,
                _table: &str,
                _where_clause: &HashMap<String, Value>,
            ) -> crate::Result<Vec<HashMap<String, Value>>> {
                Ok(vec![])
            }
        }

        let store = FailingStore;
        let writer = TranscriptWriter::new(&store, 1, 10_240);

        let (etx, erx) = mpsc::channel(16);
        let (ftx, frx) = mpsc::channel(16);

        etx.send(GraphEvent::ModelBlock(ContentBlock::text("hi"))).await.unwrap();
        etx.send(GraphEvent::Done).await.unwrap();
        drop(etx);

        writer.run(erx, ftx).await;
        let frames = drain_frames(frx).await;
        assert!(frames.last().unwrap().done);
    }
}
