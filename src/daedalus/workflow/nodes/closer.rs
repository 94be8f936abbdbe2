// SPDX-License-Identifier: MIT

//! Conversation closing node

use async_trait::async_trait;

use super::{conversational_turn, Node, NodeContext};
use crate::adk::agent::{LLMAgent, StreamMode};
use crate::adk::error::DaedalusError;
use crate::daedalus::workflow::graph::types::NodeId;
use crate::daedalus::workflow::state::{StateUpdate, WorkflowState};

/// Explains how to run the finished agent and says goodbye.
///
/// Its turn is appended to the history like any other, so the final
/// checkpoint still holds the whole conversation.
pub struct ConversationCloser {
    agent: LLMAgent,
    mode: StreamMode,
}

impl ConversationCloser {
    pub fn new(agent: LLMAgent, mode: StreamMode) -> Self {
        Self { agent, mode }
    }
}

#[async_trait]
impl Node for ConversationCloser {
    fn id(&self) -> NodeId {
        NodeId::CloseConversation
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, DaedalusError> {
        let batch = conversational_turn(&self.agent, self.mode, state, None, ctx.writer).await?;
        Ok(StateUpdate::default().append(batch))
    }
}
