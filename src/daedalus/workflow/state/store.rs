// SPDX-License-Identifier: MIT

//! Runtime state for one session

use serde::{Deserialize, Serialize};

use super::batch::MessageBatch;

/// Everything a session carries between nodes and across suspensions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Most recent human input, overwritten every cycle
    pub latest_user_message: String,
    /// One batch per completed agent turn, in call order
    #[serde(default)]
    pub message_history: Vec<MessageBatch>,
    /// Scope document, set once by scope definition
    #[serde(default)]
    pub scope: String,
}

/// Partial update returned by a node.
///
/// Fields left `None`/empty are untouched when merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub latest_user_message: Option<String>,
    /// Batches to append after the existing history
    pub messages: Vec<MessageBatch>,
    pub scope: Option<String>,
}

impl WorkflowState {
    /// Fresh state for a session opened with `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            latest_user_message: message.into(),
            ..Self::default()
        }
    }

    /// Merge a node's update: overwrite for scalar fields, append for history
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(message) = update.latest_user_message {
            self.latest_user_message = message;
        }
        if let Some(scope) = update.scope {
            self.scope = scope;
        }
        self.message_history.extend(update.messages);
    }

    /// Number of completed agent turns
    pub fn turns(&self) -> usize {
        self.message_history.len()
    }
}

impl StateUpdate {
    pub fn scope(scope: String) -> Self {
        Self {
            scope: Some(scope),
            ..Self::default()
        }
    }

    pub fn user_message(message: String) -> Self {
        Self {
            latest_user_message: Some(message),
            ..Self::default()
        }
    }

    pub fn append(mut self, batch: MessageBatch) -> Self {
        self.messages.push(batch);
        self
    }
}
