// SPDX-License-Identifier: MIT

//! Agent module - single-persona LLM agents and their output plumbing
//!
//! This module provides:
//! - `LLMAgent` - a system persona bound to a model, run buffered or streamed
//! - `StreamWriter` - the sink every emitted fragment goes through
//! - `AgentEvent` - what an outer caller observes while a workflow runs

mod llm;

pub use llm::LLMAgent;

use crate::adk::model::Content;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AgentEvent {
    /// Session id assigned by the driver
    Session(String),
    /// A workflow node began executing
    NodeStarted(String),
    /// A fragment of model output, in production order
    Delta(String),
    /// The workflow suspended and waits for the next user message
    AwaitingInput,
    /// The workflow reached its terminal state
    Finished,
    Error(String),
}

/// How model output reaches the writer.
///
/// Local servers only get buffered calls whose full text is emitted once;
/// hosted endpoints stream deltas as they arrive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    Buffered,
    #[default]
    Streamed,
}

impl StreamMode {
    /// Infer the mode from the model endpoint
    pub fn for_base_url(base_url: &str) -> Self {
        if base_url.to_lowercase().contains("localhost") {
            StreamMode::Buffered
        } else {
            StreamMode::Streamed
        }
    }
}

/// Output sink for a single workflow run.
///
/// A closed receiver is not an error: the caller went away, but the turn
/// still completes and gets checkpointed.
#[derive(Debug, Clone)]
pub struct StreamWriter {
    tx: Option<mpsc::Sender<AgentEvent>>,
}

impl StreamWriter {
    pub fn new(tx: mpsc::Sender<AgentEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A writer that discards everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Forward one output fragment
    pub async fn emit(&self, fragment: impl Into<String>) {
        self.send(AgentEvent::Delta(fragment.into())).await;
    }

    pub async fn send(&self, event: AgentEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                log::debug!("Stream receiver dropped, discarding event");
            }
        }
    }
}

/// What an agent is asked to do in one call
#[derive(Debug, Clone, Copy)]
pub struct AgentInput<'a> {
    /// The new user-side prompt for this turn
    pub prompt: &'a str,
    /// Prior conversation, oldest first
    pub history: &'a [Content],
    /// Extra context appended to the system instruction for this call only
    pub context: Option<&'a str>,
}

impl<'a> AgentInput<'a> {
    pub fn new(prompt: &'a str, history: &'a [Content]) -> Self {
        Self {
            prompt,
            history,
            context: None,
        }
    }

    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = Some(context);
        self
    }
}

/// Result of one agent call
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    /// Full visible text the model produced
    pub output: String,
    /// Messages this call added to the conversation: the request, then the response
    pub new_messages: Vec<Content>,
}
