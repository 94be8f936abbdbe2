// SPDX-License-Identifier: MIT

//! Code refinement node

use async_trait::async_trait;

use super::{conversational_turn, Node, NodeContext};
use crate::adk::agent::{LLMAgent, StreamMode};
use crate::adk::error::{DaedalusError, WorkflowError};
use crate::daedalus::workflow::graph::types::NodeId;
use crate::daedalus::workflow::prompts;
use crate::daedalus::workflow::state::{StateUpdate, WorkflowState};

/// Builds or refines the agent from the scope and the user's feedback
pub struct CodeRefiner {
    agent: LLMAgent,
    mode: StreamMode,
}

impl CodeRefiner {
    pub fn new(agent: LLMAgent, mode: StreamMode) -> Self {
        Self { agent, mode }
    }
}

#[async_trait]
impl Node for CodeRefiner {
    fn id(&self) -> NodeId {
        NodeId::RefineCode
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, DaedalusError> {
        if state.scope.trim().is_empty() {
            return Err(WorkflowError::ScopeMissing.into());
        }

        let scope_context = prompts::build_scope_context(&state.scope);
        let batch = conversational_turn(
            &self.agent,
            self.mode,
            state,
            Some(&scope_context),
            ctx.writer,
        )
        .await?;

        Ok(StateUpdate::user_message(state.latest_user_message.clone()).append(batch))
    }
}
