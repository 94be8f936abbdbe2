// SPDX-License-Identifier: MIT

//! Routing decision at the input gate

use crate::adk::agent::{AgentInput, LLMAgent};
use crate::adk::error::ModelError;
use crate::daedalus::workflow::graph::types::Route;
use crate::daedalus::workflow::prompts;

/// Classifies the latest user message as continue or finish
pub struct Router {
    agent: LLMAgent,
}

impl Router {
    pub fn new(agent: LLMAgent) -> Self {
        Self { agent }
    }

    /// Malformed labels fall back to `Route::Continue`; only a failed model
    /// call is an error.
    pub async fn route(&self, user_message: &str) -> Result<Route, ModelError> {
        let prompt = prompts::build_router_prompt(user_message);
        let run = self.agent.run(AgentInput::new(&prompt, &[])).await?;
        let route = Route::from_label(&run.output);
        log::info!("Router classified message as {:?}", route);
        Ok(route)
    }
}
