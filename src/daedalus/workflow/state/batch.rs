// SPDX-License-Identifier: MIT

//! Serialized message batches
//!
//! One batch holds the messages produced by a single agent turn. Batches
//! stay opaque strings in state and checkpoints; they are only parsed when
//! a node needs the conversation back.

use serde::{Deserialize, Serialize};

use crate::adk::error::WorkflowError;
use crate::adk::model::Content;

/// JSON snapshot of one agent turn's new messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBatch(String);

impl MessageBatch {
    pub fn encode(messages: &[Content]) -> Result<Self, serde_json::Error> {
        serde_json::to_string(messages).map(Self)
    }

    /// Wrap an already-serialized batch without validating it
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<Vec<Content>, serde_json::Error> {
        serde_json::from_str(&self.0)
    }
}

/// Flatten batches, oldest first, into one conversation.
///
/// A batch that does not decode means the persisted session is corrupt.
pub fn reconstruct_history(batches: &[MessageBatch]) -> Result<Vec<Content>, WorkflowError> {
    let mut history = Vec::new();
    for (index, batch) in batches.iter().enumerate() {
        let messages = batch
            .decode()
            .map_err(|source| WorkflowError::CorruptHistory { index, source })?;
        history.extend(messages);
    }
    Ok(history)
}
