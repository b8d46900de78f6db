//! Configuration surface for the agent execution core.
//!
//! Two layers live here:
//!
//! - [`Provider`]/[`get_base_url`]/[`get_model`]: convenience helpers for
//!   resolving a base URL or model name against local OpenAI-compatible
//!   servers (LM Studio, Ollama, llama.cpp, vLLM), kept from the original
//!   SDK surface.
//! - [`CoreConfig`]: the immutable bundle the agent execution core actually
//!   runs on — per-operator endpoints/credentials, tool-call limits, length
//!   caps, and the recursion-budget multiplier. Built once, from a flat
//!   key/value bundle, and passed by reference; nothing downstream re-reads
//!   the environment.
//!
//! ## Environment Variables
//!
//! - `OPEN_AGENT_BASE_URL`: Override base URL for any provider
//! - `OPEN_AGENT_MODEL`: Override model name (when prefer_env is true)
//! - `OPERATOR_<NAME>_RUNTIME` / `_ENDPOINT` / `_API_KEY` / `_ORG_ID` /
//!   `_PROJECT_ID`: per-operator entries consumed by [`CoreConfig::from_env`]
//!
//! ## Examples
//!
//! ```rust
//! use agent_core::{Provider, get_base_url, get_model, AgentOptions};
//!
//! // Quick setup with provider defaults
//! let url = get_base_url(Some(Provider::Ollama), None);
//! let model = get_model(Some("llama3:8b"), false);
//!
//! // Build options
//! let options = AgentOptions::builder()
//!     .system_prompt("You are a helpful assistant")
//!     .model(model.unwrap())
//!     .base_url(&url)
//!     .build()
//!     .unwrap();
//! ```

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::providers::Runtime;
use crate::{Error, Result};

// ============================================================================
// PROVIDER ENUM
// ============================================================================

/// Enum representing supported local LLM server providers.
///
/// Each provider has a default base URL where its API server typically runs.
/// These are convenience shortcuts to avoid hardcoding URLs in application code.
///
/// ## Provider Details
///
/// | Provider | Default URL | Port | Description |
/// |----------|-------------|------|-------------|
/// | LMStudio | http://localhost:1234/v1 | 1234 | GUI-based local server |
/// | Ollama | http://localhost:11434/v1 | 11434 | CLI-focused server |
/// | LlamaCpp | http://localhost:8080/v1 | 8080 | C++ inference engine |
/// | VLLM | http://localhost:8000/v1 | 8000 | High-performance server |
///
/// All providers implement the OpenAI-compatible API standard, making them
/// interchangeable from the SDK's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// LM Studio - Popular GUI-based local model server (default port 1234)
    LMStudio,

    /// Ollama - Command-line focused local model server (default port 11434)
    Ollama,

    /// llama.cpp - C++ inference engine with server mode (default port 8080)
    LlamaCpp,

    /// vLLM - High-performance inference server (default port 8000)
    VLLM,
}

impl Provider {
    /// Get the default base URL for this provider.
    ///
    /// Returns the standard localhost URL where each provider's API server
    /// typically runs. All URLs include the `/v1` path suffix required by
    /// the OpenAI-compatible API standard.
    ///
    /// # Returns
    ///
    /// A static string slice containing the full base URL including protocol,
    /// host, port, and API version path.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use agent_core::Provider;
    ///
    /// assert_eq!(Provider::Ollama.default_url(), "http://localhost:11434/v1");
    /// assert_eq!(Provider::LMStudio.default_url(), "http://localhost:1234/v1");
    /// ```
    pub fn default_url(&self) -> &'static str {
        match self {
            // LM Studio's default port from their documentation
            Provider::LMStudio => "http://localhost:1234/v1",

            // Ollama's default port from their documentation
            Provider::Ollama => "http://localhost:11434/v1",

            // llama.cpp server's common default port
            Provider::LlamaCpp => "http://localhost:8080/v1",

            // vLLM's default port from their documentation
            Provider::VLLM => "http://localhost:8000/v1",
        }
    }
}

// ============================================================================
// FROMSTR IMPLEMENTATION FOR PARSING
// ============================================================================

impl FromStr for Provider {
    type Err = String;

    /// Parse a provider name from a string.
    ///
    /// This implementation is case-insensitive and supports multiple naming
    /// conventions (dashes, underscores, dots) for flexibility.
    ///
    /// # Supported Formats
    ///
    /// - **LMStudio**: "lmstudio", "lm-studio", "lm_studio" (case-insensitive)
    /// - **Ollama**: "ollama" (case-insensitive)
    /// - **LlamaCpp**: "llamacpp", "llama-cpp", "llama_cpp", "llama.cpp" (case-insensitive)
    /// - **VLLM**: "vllm" (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns a `String` error message if the provider name is not recognized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use agent_core::Provider;
    /// use std::str::FromStr;
    ///
    /// let provider = "ollama".parse::<Provider>().unwrap();
    /// assert_eq!(provider, Provider::Ollama);
    ///
    /// let provider = "LM-Studio".parse::<Provider>().unwrap();
    /// assert_eq!(provider, Provider::LMStudio);
    ///
    /// assert!("unknown".parse::<Provider>().is_err());
    /// ```
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Convert to lowercase for case-insensitive matching
        match s.to_lowercase().as_str() {
            // LM Studio accepts multiple common variations
            "lmstudio" | "lm-studio" | "lm_studio" => Ok(Provider::LMStudio),

            // Ollama is simple
            "ollama" => Ok(Provider::Ollama),

            // llama.cpp has many variations in the wild
            "llamacpp" | "llama-cpp" | "llama_cpp" | "llama.cpp" => Ok(Provider::LlamaCpp),

            // vLLM is straightforward
            "vllm" => Ok(Provider::VLLM),

            // Unrecognized provider name
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

// ============================================================================
// CONFIGURATION HELPER FUNCTIONS
// ============================================================================

/// Get the base URL for API requests with environment variable support.
///
/// This function implements a priority-based resolution strategy for determining
/// the API base URL, making it easy to override defaults during development or deployment.
///
/// ## Resolution Priority
///
/// 1. **Environment Variable**: `OPEN_AGENT_BASE_URL` (highest priority)
/// 2. **Provider Default**: The provider's default URL if specified
/// 3. **Fallback Parameter**: Explicit fallback value
/// 4. **Ultimate Default**: LM Studio's default URL (http://localhost:1234/v1)
///
/// ## Use Cases
///
/// - **Development**: Use provider defaults for quick setup
/// - **Testing**: Override with environment variable to point to test server
/// - **Production**: Specify explicit fallback for reliability
///
/// # Arguments
///
/// * `provider` - Optional provider enum to use its default URL
/// * `fallback` - Optional explicit fallback URL string
///
/// # Returns
///
/// The resolved base URL as a `String`. Always returns a value (never None).
///
/// # Examples
///
/// ```rust,no_run
/// use agent_core::{get_base_url, Provider};
///
/// // Use Ollama's default (http://localhost:11434/v1)
/// let url = get_base_url(Some(Provider::Ollama), None);
///
/// // With explicit fallback
/// let url = get_base_url(None, Some("http://localhost:1234/v1"));
///
/// // Override via environment (takes precedence over everything)
/// // SAFETY: This is a doctest example showing how env vars work
/// unsafe { std::env::set_var("OPEN_AGENT_BASE_URL", "http://custom-server:8080/v1"); }
/// let url = get_base_url(Some(Provider::Ollama), None);
/// // Returns "http://custom-server:8080/v1" despite provider being set
/// ```
pub fn get_base_url(provider: Option<Provider>, fallback: Option<&str>) -> String {
    // Priority 1: Check environment variable first (allows runtime override)
    if let Ok(url) = env::var("OPEN_AGENT_BASE_URL") {
        return url;
    }

    // Priority 2: Use provider's default URL if specified
    if let Some(p) = provider {
        return p.default_url().to_string();
    }

    // Priority 3: Use explicit fallback, or default to LM Studio
    fallback
        .unwrap_or(Provider::LMStudio.default_url())
        .to_string()
}

/// Get the model name with optional environment variable override.
///
/// This function provides flexible model name resolution with opt-in environment
/// variable support. Unlike `get_base_url`, environment variable checking is
/// controlled by the `prefer_env` parameter.
///
/// ## Resolution Priority
///
/// If `prefer_env` is `true`:
/// 1. **Environment Variable**: `OPEN_AGENT_MODEL` (if set)
/// 2. **Fallback Parameter**: Explicit fallback value
///
/// If `prefer_env` is `false`:
/// 1. **Fallback Parameter**: Explicit fallback value only
///
/// ## Why Optional Environment Override?
///
/// Model names are often specified explicitly in code for consistency across
/// environments. The `prefer_env` flag gives you control over whether to
/// allow environment overrides.
///
/// # Arguments
///
/// * `fallback` - Optional explicit model name
/// * `prefer_env` - Whether to check environment variable first
///
/// # Returns
///
/// `Some(String)` if a model name was found, `None` if no model specified
///
/// # Examples
///
/// ```rust,no_run
/// use agent_core::get_model;
///
/// // Use explicit model name, allow environment override
/// let model = get_model(Some("llama3:8b"), true);
///
/// // Force specific model (ignore environment)
/// let model = get_model(Some("qwen2.5-32b"), false);
///
/// // Try environment only
/// let model = get_model(None, true);
/// // Returns Some(model) if OPEN_AGENT_MODEL is set, None otherwise
/// ```
pub fn get_model(fallback: Option<&str>, prefer_env: bool) -> Option<String> {
    // If environment override is preferred, check it first
    if prefer_env {
        if let Ok(model) = env::var("OPEN_AGENT_MODEL") {
            return Some(model);
        }
    }

    // Fall back to the explicit parameter (if provided)
    fallback.map(|s| s.to_string())
}

// ============================================================================
// CORE CONFIG
// ============================================================================

/// Endpoint and credentials for a single upstream operator (provider account).
///
/// Mirrors the operator registry contract's `get(operator_name)` shape
/// (runtime, endpoint, api_key, org_id, project_id) without implementing the
/// registry itself — that lookup lives behind [`crate::registry::OperatorRegistry`].
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    pub runtime: Runtime,
    pub endpoint: String,
    pub api_key: String,
    pub org_id: Option<String>,
    pub project_id: Option<String>,
}

/// Immutable configuration bundle for the agent execution core.
///
/// Built once at process start from a flat key/value bundle (environment
/// variables or an equivalent map) and passed by reference from then on.
/// Nothing downstream re-reads the environment directly.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Per-operator endpoint/credential table, keyed by operator id.
    pub operators: HashMap<String, OperatorConfig>,

    /// Default recursion budget input for providers other than Anthropic.
    pub tool_call_limit_default: u32,

    /// Recursion budget input used for the Anthropic runtime.
    pub tool_call_limit_anthropic: u32,

    /// Cap, in characters, applied to human input before it reaches the core.
    pub input_max_length: usize,

    /// Cap, in characters, applied to an assistant response before persistence.
    pub output_max_length: usize,

    /// Length at which persisted text/reasoning bodies are truncated.
    pub transcript_truncate_len: usize,

    /// Multiplier applied to `(tool_call_limit + 1)` to derive the node-visit budget.
    pub recursion_multiplier: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            operators: HashMap::new(),
            tool_call_limit_default: 10,
            tool_call_limit_anthropic: 25,
            input_max_length: 32_000,
            output_max_length: 32_000,
            transcript_truncate_len: 10_240,
            recursion_multiplier: 2,
        }
    }
}

impl CoreConfig {
    /// Tool-call limit that applies for the given runtime.
    pub fn tool_call_limit_for(&self, runtime: Runtime) -> u32 {
        match runtime {
            Runtime::Anthropic => self.tool_call_limit_anthropic,
            _ => self.tool_call_limit_default,
        }
    }

    /// Recursion (node-visit) budget derived from a tool-call limit:
    /// `(tool_call_limit + 1) * recursion_multiplier`.
    pub fn recursion_budget_for(&self, runtime: Runtime) -> u32 {
        (self.tool_call_limit_for(runtime) + 1) * self.recursion_multiplier
    }

    /// Operator lookup by id.
    pub fn operator(&self, operator_name: &str) -> Option<&OperatorConfig> {
        self.operators.get(operator_name)
    }

    /// Build a `CoreConfig` from a flat key/value bundle.
    ///
    /// Recognized keys: `TOOL_CALL_LIMIT_DEFAULT`, `TOOL_CALL_LIMIT_ANTHROPIC`,
    /// `INPUT_MAX_LENGTH`, `OUTPUT_MAX_LENGTH`, `TRANSCRIPT_TRUNCATE_LEN`,
    /// `RECURSION_MULTIPLIER`, and per-operator keys of the form
    /// `OPERATOR_<NAME>_RUNTIME` / `_ENDPOINT` / `_API_KEY` / `_ORG_ID` /
    /// `_PROJECT_ID`. Unrecognized keys are ignored.
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = values.get("TOOL_CALL_LIMIT_DEFAULT") {
            config.tool_call_limit_default = parse_u32(v, "TOOL_CALL_LIMIT_DEFAULT")?;
        }
        if let Some(v) = values.get("TOOL_CALL_LIMIT_ANTHROPIC") {
            config.tool_call_limit_anthropic = parse_u32(v, "TOOL_CALL_LIMIT_ANTHROPIC")?;
        }
        if let Some(v) = values.get("INPUT_MAX_LENGTH") {
            config.input_max_length = parse_usize(v, "INPUT_MAX_LENGTH")?;
        }
        if let Some(v) = values.get("OUTPUT_MAX_LENGTH") {
            config.output_max_length = parse_usize(v, "OUTPUT_MAX_LENGTH")?;
        }
        if let Some(v) = values.get("TRANSCRIPT_TRUNCATE_LEN") {
            config.transcript_truncate_len = parse_usize(v, "TRANSCRIPT_TRUNCATE_LEN")?;
        }
        if let Some(v) = values.get("RECURSION_MULTIPLIER") {
            config.recursion_multiplier = parse_u32(v, "RECURSION_MULTIPLIER")?;
        }

        let mut operator_names: Vec<String> = Vec::new();
        for key in values.keys() {
            if let Some(rest) = key.strip_prefix("OPERATOR_") {
                if let Some(name) = rest.strip_suffix("_RUNTIME") {
                    operator_names.push(name.to_string());
                }
            }
        }

        for name in operator_names {
            let runtime_key = format!("OPERATOR_{name}_RUNTIME");
            let endpoint_key = format!("OPERATOR_{name}_ENDPOINT");
            let api_key_key = format!("OPERATOR_{name}_API_KEY");
            let org_id_key = format!("OPERATOR_{name}_ORG_ID");
            let project_id_key = format!("OPERATOR_{name}_PROJECT_ID");

            let runtime_str = values
                .get(&runtime_key)
                .ok_or_else(|| Error::config(format!("missing {runtime_key}")))?;
            let runtime = parse_runtime(runtime_str)?;
            let endpoint = values
                .get(&endpoint_key)
                .ok_or_else(|| Error::config(format!("missing {endpoint_key}")))?
                .clone();
            let api_key = values
                .get(&api_key_key)
                .ok_or_else(|| Error::config(format!("missing {api_key_key}")))?
                .clone();

            config.operators.insert(
                name.to_lowercase(),
                OperatorConfig {
                    runtime,
                    endpoint,
                    api_key,
                    org_id: values.get(&org_id_key).cloned(),
                    project_id: values.get(&project_id_key).cloned(),
                },
            );
        }

        Ok(config)
    }

    /// Build a `CoreConfig` from the process environment.
    ///
    /// Reads the same key set as [`Self::from_map`] via [`std::env::vars`],
    /// so operator discovery works the same whether the bundle comes from
    /// the real environment or a test-constructed map.
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_map(&values)
    }
}

fn parse_runtime(value: &str) -> Result<Runtime> {
    match value.to_lowercase().as_str() {
        "openai_responses" | "openai-responses" => Ok(Runtime::OpenAiResponses),
        "openai_completion" | "openai-completion" | "openai" => Ok(Runtime::OpenAiCompletion),
        "anthropic" => Ok(Runtime::Anthropic),
        "gemini" => Ok(Runtime::Gemini),
        "xai" => Ok(Runtime::Xai),
        "openrouter" => Ok(Runtime::OpenRouter),
        other => Err(Error::config(format!("unknown runtime: {other}"))),
    }
}

fn parse_u32(value: &str, key: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| Error::config(format!("invalid {key}: {value}")))
}

fn parse_usize(value: &str, key: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| Error::config(format!("invalid {key}: {value}")))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_default_urls() {
        assert_eq!(Provider::LMStudio.default_url(), "http://localhost:1234/v1");
        assert_eq!(Provider::Ollama.default_url(), "http://localhost:11434/v1");
        assert_eq!(Provider::LlamaCpp.default_url(), "http://localhost:8080/v1");
        assert_eq!(Provider::VLLM.default_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("lmstudio".parse::<Provider>(), Ok(Provider::LMStudio));
        assert_eq!("LM-Studio".parse::<Provider>(), Ok(Provider::LMStudio));
        assert_eq!("ollama".parse::<Provider>(), Ok(Provider::Ollama));
        assert_eq!("llamacpp".parse::<Provider>(), Ok(Provider::LlamaCpp));
        assert_eq!("llama.cpp".parse::<Provider>(), Ok(Provider::LlamaCpp));
        assert_eq!("vllm".parse::<Provider>(), Ok(Provider::VLLM));
        assert!("unknown".parse::<Provider>().is_err());
    }

    #[test]
    fn test_get_base_url_with_provider() {
        // SAFETY: This test runs in an isolated test environment where environment
        // variable modifications won't affect other tests due to test isolation.
        // The OPEN_AGENT_BASE_URL variable is specific to this library and not
        // used by the Rust standard library or other critical system components.
        unsafe {
            env::remove_var("OPEN_AGENT_BASE_URL");
        }

        let url = get_base_url(Some(Provider::Ollama), None);
        assert_eq!(url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_get_base_url_with_fallback() {
        // SAFETY: This test runs in an isolated test environment where environment
        // variable modifications won't affect other tests due to test isolation.
        // The OPEN_AGENT_BASE_URL variable is specific to this library and not
        // used by the Rust standard library or other critical system components.
        unsafe {
            env::remove_var("OPEN_AGENT_BASE_URL");
        }

        let url = get_base_url(None, Some("http://custom:8080/v1"));
        assert_eq!(url, "http://custom:8080/v1");
    }

    #[test]
    fn test_core_config_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.tool_call_limit_default, 10);
        assert_eq!(config.tool_call_limit_anthropic, 25);
        assert_eq!(config.transcript_truncate_len, 10_240);
        assert_eq!(config.recursion_budget_for(Runtime::Anthropic), 52);
        assert_eq!(config.recursion_budget_for(Runtime::OpenAiCompletion), 22);
    }

    #[test]
    fn test_core_config_from_map_parses_operator() {
        let mut values = HashMap::new();
        values.insert("OPERATOR_ACME_RUNTIME".to_string(), "anthropic".to_string());
        values.insert(
            "OPERATOR_ACME_ENDPOINT".to_string(),
            "https://api.anthropic.com".to_string(),
        );
        values.insert("OPERATOR_ACME_API_KEY".to_string(), "sk-test".to_string());
        values.insert("TOOL_CALL_LIMIT_DEFAULT".to_string(), "5".to_string());

        let config = CoreConfig::from_map(&values).unwrap();
        assert_eq!(config.tool_call_limit_default, 5);
        let operator = config.operator("acme").unwrap();
        assert_eq!(operator.runtime, Runtime::Anthropic);
        assert_eq!(operator.endpoint, "https://api.anthropic.com");
        assert!(operator.org_id.is_none());
    }

    #[test]
    fn test_core_config_from_map_missing_operator_field_errors() {
        let mut values = HashMap::new();
        values.insert("OPERATOR_ACME_RUNTIME".to_string(), "anthropic".to_string());
        // Missing OPERATOR_ACME_ENDPOINT and OPERATOR_ACME_API_KEY.

        assert!(CoreConfig::from_map(&values).is_err());
    }

    #[test]
    fn test_core_config_from_map_invalid_runtime_errors() {
        let mut values = HashMap::new();
        values.insert("OPERATOR_ACME_RUNTIME".to_string(), "not-a-runtime".to_string());
        values.insert("OPERATOR_ACME_ENDPOINT".to_string(), "x".to_string());
        values.insert("OPERATOR_ACME_API_KEY".to_string(), "x".to_string());

        assert!(CoreConfig::from_map(&values).is_err());
    }
}
