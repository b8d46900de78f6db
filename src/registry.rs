//! Out-of-scope collaborators the agent execution core consumes but does
//! not own: operator/model/tool registries, object storage, and the
//! vector search engine.
//!
//! Each is expressed as a trait so the core can be driven by a real HTTP/
//! database-backed implementation in production and an in-memory double in
//! tests. Nothing in this module performs schema migration, cache
//! invalidation policy, or routing — those live in the systems that
//! implement these traits.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::config::OperatorConfig;
use crate::providers::ReasoningEffort;
use crate::Result;

/// `get(operator_name) -> {runtime, endpoint, api_key, org_id, project_id}; list()`
///. [`crate::config::OperatorConfig`] already carries this shape,
/// so the contract is expressed in terms of it rather than a parallel type.
#[async_trait]
pub trait OperatorRegistry: Send + Sync {
    async fn get(&self, operator_name: &str) -> Result<Option<OperatorConfig>>;
    async fn list(&self) -> Result<Vec<(String, OperatorConfig)>>;
}

/// Per-model capability record: whether the model accepts image input, and
/// the reasoning effort it should be driven at.
#[derive(Debug, Clone)]
pub struct ModelRecord {
    pub multimodal: bool,
    pub reasoning_effort: ReasoningEffort,
}

/// `get(model_name) -> {multimodal flags, reasoning_effort}; is_multimodal(name) -> bool`
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn get(&self, model_name: &str) -> Result<Option<ModelRecord>>;

    async fn is_multimodal(&self, model_name: &str) -> Result<bool> {
        Ok(self.get(model_name).await?.map(|m| m.multimodal).unwrap_or(false))
    }
}

/// How a remote tool descriptor is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSourceType {
    Http,
    Mcp,
}

/// `get(tool_name) -> {type, url, headers}`. Covers the DB-backed remote
/// tool endpoints; built-in tools never go through this lookup.
#[derive(Debug, Clone)]
pub struct ToolRecord {
    pub tool_type: ToolSourceType,
    pub url: String,
    pub headers: HashMap<String, String>,
}

#[async_trait]
pub trait ToolRegistryLookup: Send + Sync {
    async fn get(&self, tool_name: &str) -> Result<Option<ToolRecord>>;
    async fn list(&self) -> Result<Vec<(String, ToolRecord)>>;
}

/// `download_to_memory(uri) -> bytes; upload(bytes, path, content_type) -> bool`
///. Backs the Prompt Assembler's attachment downloads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download_to_memory(&self, uri: &str) -> Result<Vec<u8>>;
    async fn upload(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> Result<bool>;
}

/// A single retrieved document from a similarity search.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// `similarity_search(collection, query, k, threshold) -> list<doc>`. Backs the Prompt Assembler's knowledge-base injection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn similarity_search(
        &self,
        collection: &str,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<Document>>;
}

// ============================================================================
// IN-MEMORY TEST DOUBLES
// ============================================================================

/// In-memory [`OperatorRegistry`] double, backed by a plain map.
#[derive(Default)]
pub struct InMemoryOperatorRegistry {
    operators: RwLock<HashMap<String, OperatorConfig>>,
}

impl InMemoryOperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, config: OperatorConfig) {
        self.operators.write().unwrap().insert(name.into(), config);
    }
}

#[async_trait]
impl OperatorRegistry for InMemoryOperatorRegistry {
    async fn get(&self, operator_name: &str) -> Result<Option<OperatorConfig>> {
        Ok(self.operators.read().unwrap().get(operator_name).cloned())
    }

    async fn list(&self) -> Result<Vec<(String, OperatorConfig)>> {
        Ok(self
            .operators
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// In-memory [`ModelRegistry`] double.
#[derive(Default)]
pub struct InMemoryModelRegistry {
    models: RwLock<HashMap<String, ModelRecord>>,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, record: ModelRecord) {
        self.models.write().unwrap().insert(name.into(), record);
    }
}

#[async_trait]
impl ModelRegistry for InMemoryModelRegistry {
    async fn get(&self, model_name: &str) -> Result<Option<ModelRecord>> {
        Ok(self.models.read().unwrap().get(model_name).cloned())
    }
}

/// In-memory [`ToolRegistryLookup`] double.
#[derive(Default)]
pub struct InMemoryToolRegistryLookup {
    tools: RwLock<HashMap<String, ToolRecord>>,
}

impl InMemoryToolRegistryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, record: ToolRecord) {
        self.tools.write().unwrap().insert(name.into(), record);
    }
}

#[async_trait]
impl ToolRegistryLookup for InMemoryToolRegistryLookup {
    async fn get(&self, tool_name: &str) -> Result<Option<ToolRecord>> {
        Ok(self.tools.read().unwrap().get(tool_name).cloned())
    }

    async fn list(&self) -> Result<Vec<(String, ToolRecord)>> {
        Ok(self
            .tools
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// In-memory [`ObjectStore`] double, keyed by URI.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().unwrap().insert(uri.into(), bytes);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn download_to_memory(&self, uri: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| crate::Error::other(format!("object not found: {uri}")))
    }

    async fn upload(&self, bytes: Vec<u8>, path: &str, _content_type: &str) -> Result<bool> {
        self.objects.write().unwrap().insert(path.to_string(), bytes);
        Ok(true)
    }
}

/// In-memory [`VectorStore`] double; `similarity_search` always returns the
/// seeded documents for a collection, ignoring `query`/`threshold` (it's a
/// test double, not a ranking engine).
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, collection: impl Into<String>, docs: Vec<Document>) {
        self.collections.write().unwrap().insert(collection.into(), docs);
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn similarity_search(
        &self,
        collection: &str,
        _query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<Document>> {
        let docs = self
            .collections
            .read()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default();
        Ok(docs
            .into_iter()
            .filter(|d| d.score >= threshold)
            .take(k)
            .collect())
    }
}

// ============================================================================
// REDIS READ-THROUGH CACHE
// ============================================================================

/// Read-through cache wrapping any registry, backed by Redis.
///
/// On a cache hit, returns the cached value. On a miss or a Redis failure,
/// falls through to the wrapped registry and best-effort refills the cache
/// (a refill failure is logged and otherwise ignored — the read already
/// succeeded via the wrapped registry).
pub struct RedisRegistryCache<R> {
    inner: R,
    client: redis::Client,
    prefix: &'static str,
    ttl_seconds: u64,
}

impl<R> RedisRegistryCache<R> {
    pub fn new(inner: R, client: redis::Client, prefix: &'static str, ttl_seconds: u64) -> Self {
        Self {
            inner,
            client,
            prefix,
            ttl_seconds,
        }
    }

    async fn connection(&self) -> Option<redis::aio::ConnectionManager> {
        match self.client.get_connection_manager().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                log::warn!("redis registry cache: connection failed, falling through: {e}");
                None
            }
        }
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }
}

#[async_trait]
impl<R: OperatorRegistry> OperatorRegistry for RedisRegistryCache<R> {
    async fn get(&self, operator_name: &str) -> Result<Option<OperatorConfig>> {
        use redis::AsyncCommands;

        let key = self.key(operator_name);
        if let Some(mut conn) = self.connection().await {
            if let Ok(Some(cached)) = conn.get::<_, Option<String>>(&key).await {
                if let Ok(config) = serde_json::from_str::<CachedOperator>(&cached) {
                    return Ok(Some(config.into()));
                }
            }
        }

        let value = self.inner.get(operator_name).await?;
        if let (Some(config), Some(mut conn)) = (&value, self.connection().await) {
            let cached: CachedOperator = config.clone().into();
            if let Ok(payload) = serde_json::to_string(&cached) {
                let _: std::result::Result<(), _> =
                    conn.set_ex(&key, payload, self.ttl_seconds).await;
            }
        }
        Ok(value)
    }

    async fn list(&self) -> Result<Vec<(String, OperatorConfig)>> {
        // Listing bypasses the cache; it's not a per-key lookup and the
        // wrapped registry is the system-of-record for enumeration.
        self.inner.list().await
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CachedOperator {
    runtime: String,
    endpoint: String,
    api_key: String,
    org_id: Option<String>,
    project_id: Option<String>,
}

impl From<OperatorConfig> for CachedOperator {
    fn from(c: OperatorConfig) -> Self {
        let runtime = match c.runtime {
            crate::providers::Runtime::OpenAiResponses => "openai_responses",
            crate::providers::Runtime::OpenAiCompletion => "openai_completion",
            crate::providers::Runtime::Anthropic => "anthropic",
            crate::providers::Runtime::Gemini => "gemini",
            crate::providers::Runtime::Xai => "xai",
            crate::providers::Runtime::OpenRouter => "openrouter",
        }
        .to_string();
        Self {
            runtime,
            endpoint: c.endpoint,
            api_key: c.api_key,
            org_id: c.org_id,
            project_id: c.project_id,
        }
    }
}

impl From<CachedOperator> for OperatorConfig {
    fn from(c: CachedOperator) -> Self {
        let runtime = match c.runtime.as_str() {
            "openai_responses" => crate::providers::Runtime::OpenAiResponses,
            "openai_completion" => crate::providers::Runtime::OpenAiCompletion,
            "anthropic" => crate::providers::Runtime::Anthropic,
            "gemini" => crate::providers::Runtime::Gemini,
            "xai" => crate::providers::Runtime::Xai,
            _ => crate::providers::Runtime::OpenRouter,
        };
        Self {
            runtime,
            endpoint: c.endpoint,
            api_key: c.api_key,
            org_id: c.org_id,
            project_id: c.project_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_operator_registry_roundtrips() {
        let registry = InMemoryOperatorRegistry::new();
        registry.insert(
            "acme",
            OperatorConfig {
                runtime: crate::providers::Runtime::Anthropic,
                endpoint: "https://api.anthropic.com".into(),
                api_key: "sk-test".into(),
                org_id: None,
                project_id: None,
            },
        );

        let found = registry.get("acme").await.unwrap().unwrap();
        assert_eq!(found.endpoint, "https://api.anthropic.com");
        assert!(registry.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn model_registry_is_multimodal_defaults_false_for_unknown_model() {
        let registry = InMemoryModelRegistry::new();
        assert!(!registry.is_multimodal("unknown-model").await.unwrap());

        registry.insert(
            "vision-model",
            ModelRecord {
                multimodal: true,
                reasoning_effort: ReasoningEffort::Medium,
            },
        );
        assert!(registry.is_multimodal("vision-model").await.unwrap());
    }

    #[tokio::test]
    async fn vector_store_filters_by_threshold_and_caps_at_k() {
        let store = InMemoryVectorStore::new();
        store.seed(
            "docs",
            vec![
                Document { content: "a".into(), score: 0.9, metadata: serde_json::json!({}) },
                Document { content: "b".into(), score: 0.2, metadata: serde_json::json!({}) },
                Document { content: "c".into(), score: 0.8, metadata: serde_json::json!({}) },
            ],
        );

        let results = store.similarity_search("docs", "query", 1, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "a");
    }

    #[tokio::test]
    async fn object_store_roundtrips_through_upload_and_download() {
        let store = InMemoryObjectStore::new();
        store.upload(vec![1, 2, 3], "path/to/file".into(), "application/octet-stream").await.unwrap();
        let bytes = store.download_to_memory("path/to/file").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn tool_registry_lookup_returns_none_for_unregistered_tool() {
        let registry = InMemoryToolRegistryLookup::new();
        assert!(registry.get("nonexistent").await.unwrap().is_none());
    }
}
