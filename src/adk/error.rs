// SPDX-License-Identifier: MIT

//! Typed error handling for daedalus-rs
//!
//! Model failures, corrupted session data and store failures are kept in
//! separate enums so callers can tell a transient service problem apart
//! from a session whose persisted state can no longer be trusted.

use thiserror::Error;

/// Top-level error type for daedalus-rs
#[derive(Debug, Error)]
pub enum DaedalusError {
    /// Language-model invocation failed
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Workflow engine errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Checkpoint store errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Documentation lookup errors
    #[error("Documentation lookup failed: {0}")]
    Docs(String),

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Workflow-specific errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A persisted history batch could not be decoded
    #[error("Corrupted message history in batch {index}: {source}")]
    CorruptHistory {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// No checkpoint exists for the session
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// Resume was called on a session that is not suspended at the input gate
    #[error("Session '{session_id}' is not awaiting input (next node: {next})")]
    NotAwaitingInput { session_id: String, next: String },

    /// User message was empty after trimming
    #[error("User message must not be empty")]
    EmptyMessage,

    /// Refinement was reached before a scope document exists
    #[error("Scope must be defined before code refinement")]
    ScopeMissing,

    /// Session ids must be non-empty and limited to `[A-Za-z0-9_-]`
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Non-success status from the provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Transport failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Request or response body could not be (de)serialized
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Checkpoint store errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O failed for session '{session_id}': {source}")]
    Io {
        session_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint for session '{session_id}' is unreadable: {source}")]
    Serde {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),
}

impl DaedalusError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a documentation lookup error
    pub fn docs(message: impl Into<String>) -> Self {
        Self::Docs(message.into())
    }

    /// True when the error means the session's persisted data is damaged,
    /// as opposed to a transient failure worth retrying.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Workflow(WorkflowError::CorruptHistory { .. })
                | Self::Checkpoint(CheckpointError::Serde { .. })
        )
    }
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
