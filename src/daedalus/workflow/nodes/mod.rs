// SPDX-License-Identifier: MIT

//! Workflow nodes
//!
//! Each working node reads the session state and returns a partial
//! update; the engine merges it and picks the next node. The router is not
//! a node: it only chooses an edge and never touches state.

mod closer;
mod coder;
mod router;
mod scope;

pub use closer::ConversationCloser;
pub use coder::CodeRefiner;
pub use router::Router;
pub use scope::ScopeDefiner;

use async_trait::async_trait;

use crate::adk::agent::{AgentInput, LLMAgent, StreamMode, StreamWriter};
use crate::adk::error::{DaedalusError, WorkflowError};
use crate::daedalus::workflow::graph::types::NodeId;
use crate::daedalus::workflow::state::{
    reconstruct_history, MessageBatch, StateUpdate, WorkflowState,
};

/// Per-run context handed to every node
pub struct NodeContext<'a> {
    pub session_id: &'a str,
    pub writer: &'a StreamWriter,
}

#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> NodeId;

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, DaedalusError>;
}

/// One conversational turn: rebuild the history from its batches, stream
/// the agent's reply to the writer, and pack this turn's messages into a
/// new batch.
async fn conversational_turn(
    agent: &LLMAgent,
    mode: StreamMode,
    state: &WorkflowState,
    context: Option<&str>,
    writer: &StreamWriter,
) -> Result<MessageBatch, DaedalusError> {
    if state.latest_user_message.trim().is_empty() {
        return Err(WorkflowError::EmptyMessage.into());
    }

    let history = reconstruct_history(&state.message_history)?;
    let mut input = AgentInput::new(&state.latest_user_message, &history);
    if let Some(ctx) = context {
        input = input.with_context(ctx);
    }

    let run = agent.run_stream(input, mode, writer).await?;
    Ok(MessageBatch::encode(&run.new_messages)?)
}
