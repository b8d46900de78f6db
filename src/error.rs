//! Error types for the Open Agent SDK

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// API error from the model server
    #[error("API error: {0}")]
    Api(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// Provider transport failed (connection reset, DNS, TLS, etc).
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider rejected the request (auth, quota, malformed body).
    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    /// Provider response violated its own documented schema.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Engine recursion budget exceeded without reaching `END`.
    #[error("Agent graph recursion budget exceeded ({0} node visits)")]
    RecursionBudgetExceeded(usize),

    /// A relational store write failed. Never propagated past the
    /// Transcript Writer — logged and swallowed.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// Caller cancelled the in-flight request.
    #[error("Request cancelled")]
    Cancelled,

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a new stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }

    /// Create a new tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a timeout error
    pub fn timeout() -> Self {
        Error::Timeout
    }

    /// Create a provider-unavailable error (transport failure).
    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        Error::ProviderUnavailable(msg.into())
    }

    /// Create a provider-rejected error (auth/quota/body rejection).
    pub fn provider_rejected(msg: impl Into<String>) -> Self {
        Error::ProviderRejected(msg.into())
    }

    /// Create a malformed-response error (provider violated its own schema).
    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Error::MalformedResponse(msg.into())
    }

    /// Create a recursion-budget-exceeded error.
    pub fn recursion_budget_exceeded(visits: usize) -> Self {
        Error::RecursionBudgetExceeded(visits)
    }

    /// Create a persistence-failed error.
    pub fn persistence_failed(msg: impl Into<String>) -> Self {
        Error::PersistenceFailed(msg.into())
    }

    /// Create a cancellation error.
    pub fn cancelled() -> Self {
        Error::Cancelled
    }

    /// Whether this error should be surfaced to the client as a terminal
    /// frame rather than silently absorbed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::ProviderUnavailable(_)
                | Error::ProviderRejected(_)
                | Error::MalformedResponse(_)
                | Error::RecursionBudgetExceeded(_)
                | Error::Cancelled
        )
    }
}
