//! The canonical typed message format the rest of the core exchanges.
//!
//! Every provider adapter translates to and from this shape instead of
//! passing provider-native wire types between components. [`ContentBlock`]
//! is pure data — translation lives one per adapter in [`crate::providers`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The atomic typed unit of a message.
///
/// Equality is structural (`derive(PartialEq)`); two blocks of the same
/// variant with the same fields are equal regardless of which adapter
/// produced them.
///
/// # Serialization
///
/// Externally tagged on `"type"`:
/// ```json
/// {"type": "text", "text": "..."}
/// {"type": "reasoning", "reasoning": "...", "extras": {}}
/// {"type": "tool_call", "id": "call_1", "name": "search", "args": {}}
/// {"type": "tool_output", "call_id": "call_1", "content": "..."}
/// {"type": "image", "mime_type": "image/png", "base64": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Final visible assistant output token(s).
    Text(TextBlock),

    /// Chain-of-thought summary. `extras` carries provider-specific
    /// signatures (e.g. Gemini thought signatures) needed to replay the
    /// turn with signed reasoning intact.
    Reasoning(ReasoningBlock),

    /// Model's request to invoke a tool. `id` is provider-scoped and is
    /// the correlation key to its eventual [`ContentBlock::ToolOutput`].
    ToolCall(ToolCallBlock),

    /// Result of executing the tool named by the matching `tool_call`.
    ToolOutput(ToolOutputBlock),

    /// User-supplied image attachment.
    Image(ImageBlock),
}

impl ContentBlock {
    /// Short discriminant used for client frame `type` fields and
    /// transcript segmentation.
    pub fn kind(&self) -> BlockKind {
        match self {
            ContentBlock::Text(_) => BlockKind::Text,
            ContentBlock::Reasoning(_) => BlockKind::Reasoning,
            ContentBlock::ToolCall(_) => BlockKind::ToolCall,
            ContentBlock::ToolOutput(_) => BlockKind::ToolOutput,
            ContentBlock::Image(_) => BlockKind::Image,
        }
    }

    /// Convenience constructor for a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextBlock { text: text.into() })
    }

    /// Convenience constructor for a reasoning block with no extras.
    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        ContentBlock::Reasoning(ReasoningBlock {
            reasoning: reasoning.into(),
            extras: BTreeMap::new(),
        })
    }

    /// Convenience constructor for a tool call block.
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        ContentBlock::ToolCall(ToolCallBlock {
            id: id.into(),
            name: name.into(),
            args,
        })
    }

    /// Convenience constructor for a tool output block.
    pub fn tool_output(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolOutput(ToolOutputBlock {
            call_id: call_id.into(),
            content: content.into(),
        })
    }
}

/// Discriminant for [`ContentBlock`] variants, independent of payload.
///
/// Used by the Transcript Writer's segmentation logic and by
/// client frame `type` fields, which use their own wire names rather than
/// this enum's `Display` (see [`crate::transcript::ClientFrame`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockKind {
    Text,
    Reasoning,
    ToolCall,
    ToolOutput,
    Image,
}

/// Final visible assistant output token(s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Chain-of-thought summary with provider-specific replay signatures.
///
/// `extras` is a free-form map rather than a fixed struct because each
/// provider's signature shape differs (Gemini's `thoughtSignature` bytes,
/// Anthropic's `signature` string, etc) and new providers may add their
/// own without changing this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReasoningBlock {
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl ReasoningBlock {
    pub fn new(reasoning: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            extras: BTreeMap::new(),
        }
    }

    /// Whether this block carries a signature that must be round-tripped
    /// verbatim on replay.
    pub fn has_replay_signature(&self) -> bool {
        !self.extras.is_empty()
    }
}

/// Model's request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallBlock {
    /// Provider-scoped id; the correlation key to the eventual tool_output.
    pub id: String,
    pub name: String,
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Result of executing the tool named by the matching `tool_call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutputBlock {
    pub call_id: String,
    pub content: String,
}

/// User-supplied image attachment.
///
/// Carries raw decoded bytes; base64 is only the persistence/wire form
///. Adapters encode to base64 at the translation boundary.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub base64: Vec<u8>,
}

impl std::fmt::Debug for ImageBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBlock")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.base64.len())
            .finish()
    }
}

impl ImageBlock {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: bytes,
        }
    }

    /// Mime type inferred from a file extension, used by the Prompt
    /// Assembler when downloading attachments from object storage
    ///.
    pub fn mime_from_extension(path: &str) -> &'static str {
        match path.rsplit('.').next().unwrap_or("").to_ascii_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }

    /// Encodes to a base64 string for wire/persistence.
    pub fn to_base64_string(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.base64)
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}

/// A role plus an ordered list of content blocks.
///
/// Invariant: a `tool` message contains exactly one [`ContentBlock::ToolOutput`]
/// whose `call_id` matches some earlier assistant `tool_call.id` in the same
/// conversation prefix. Constructors that would violate this are
/// not provided; callers build tool messages only from a known call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl Message {
    pub fn new(role: MessageRole, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, vec![ContentBlock::text(text)])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![ContentBlock::text(text)])
    }

    pub fn user_with_blocks(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Builds the single tool message for one tool_output, correlated to
    /// the call that produced it.
    pub fn tool_output(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Tool,
            vec![ContentBlock::tool_output(call_id, content)],
        )
    }

    /// Last content block, if any. Used pervasively by the Agent Graph
    /// Engine's transition table, which inspects only the
    /// *last* message's last block.
    pub fn last_block(&self) -> Option<&ContentBlock> {
        self.content.last()
    }

    /// The block types present, in order. Used to detect a "reasoning
    /// only" assistant turn.
    pub fn kinds(&self) -> Vec<BlockKind> {
        self.content.iter().map(ContentBlock::kind).collect()
    }
}

/// Append-only ordered list of [`Message`]s, mutated only by appending.
///
/// Owned by a single in-flight request; never edited in place.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    messages: Vec<Message>,
}

impl AgentState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// One observed `(name, args, id)` triple, used for duplicate-call
/// detection. Lifetime is one request.
#[derive(Debug, Clone, Default)]
pub struct ToolCallHistory {
    seen: Vec<(String, serde_json::Map<String, serde_json::Value>, String)>,
}

impl ToolCallHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a call with the same name and args has already been
    /// recorded.
    pub fn contains(&self, name: &str, args: &serde_json::Map<String, serde_json::Value>) -> bool {
        self.seen.iter().any(|(n, a, _)| n == name && a == args)
    }

    pub fn record(
        &mut self,
        name: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
        id: impl Into<String>,
    ) {
        self.seen.push((name.into(), args, id.into()));
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_block_roundtrip() {
        let block = ContentBlock::text("hi");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json, json!({"type": "text", "text": "hi"}));
        let back: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn reasoning_block_preserves_extras_on_roundtrip() {
        let mut extras = BTreeMap::new();
        extras.insert("signature".to_string(), json!("abc123"));
        let block = ContentBlock::Reasoning(ReasoningBlock {
            reasoning: "thinking...".into(),
            extras,
        });
        let json = serde_json::to_value(&block).unwrap();
        let back: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
        if let ContentBlock::Reasoning(r) = &back {
            assert!(r.has_replay_signature());
        } else {
            panic!("expected reasoning block");
        }
    }

    #[test]
    fn reasoning_without_extras_has_no_replay_signature() {
        let r = ReasoningBlock::new("plain thought");
        assert!(!r.has_replay_signature());
    }

    #[test]
    fn tool_call_and_output_correlate_by_id() {
        let mut args = serde_json::Map::new();
        args.insert("q".into(), json!("rust async"));
        let call = ContentBlock::tool_call("call_1", "web_search", args);
        let output = ContentBlock::tool_output("call_1", "no results");

        let (call_id, output_call_id) = match (&call, &output) {
            (ContentBlock::ToolCall(c), ContentBlock::ToolOutput(o)) => (&c.id, &o.call_id),
            _ => panic!("unexpected variants"),
        };
        assert_eq!(call_id, output_call_id);
    }

    #[test]
    fn image_block_roundtrips_bytes_through_base64() {
        let bytes = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let block = ImageBlock::new("image/png", bytes.clone());
        let json = serde_json::to_value(&ContentBlock::Image(block.clone())).unwrap();
        let back: ContentBlock = serde_json::from_value(json).unwrap();
        match back {
            ContentBlock::Image(b) => assert_eq!(b.base64, bytes),
            _ => panic!("expected image block"),
        }
    }

    #[test]
    fn mime_from_extension_covers_common_types() {
        assert_eq!(ImageBlock::mime_from_extension("a/b/cat.PNG"), "image/png");
        assert_eq!(ImageBlock::mime_from_extension("cat.jpeg"), "image/jpeg");
        assert_eq!(ImageBlock::mime_from_extension("cat.bin"), "application/octet-stream");
    }

    #[test]
    fn agent_state_is_append_only() {
        let mut state = AgentState::new(vec![Message::system("sys")]);
        state.push(Message::user("hi"));
        assert_eq!(state.len(), 2);
        assert_eq!(state.last().unwrap().role, MessageRole::User);
    }

    #[test]
    fn last_block_reflects_assistant_trailing_tool_call() {
        let mut args = serde_json::Map::new();
        args.insert("x".into(), json!(1));
        let msg = Message::assistant(vec![
            ContentBlock::reasoning("because"),
            ContentBlock::tool_call("c1", "calc", args),
        ]);
        assert_eq!(msg.last_block().unwrap().kind(), BlockKind::ToolCall);
    }

    #[test]
    fn tool_call_history_detects_duplicates_by_name_and_args() {
        let mut history = ToolCallHistory::new();
        let mut args = serde_json::Map::new();
        args.insert("q".into(), json!("foo"));
        assert!(!history.contains("web_search", &args));
        history.record("web_search", args.clone(), "call_1");
        assert!(history.contains("web_search", &args));

        let mut other_args = serde_json::Map::new();
        other_args.insert("q".into(), json!("bar"));
        assert!(!history.contains("web_search", &other_args));
    }
}
