// SPDX-License-Identifier: MIT

//! LLM Agent - one system persona bound to a model
//!
//! The agent rebuilds the request from its instruction, the prior
//! conversation and the new prompt on every call; it holds no
//! conversation state of its own.

use super::{AgentInput, AgentRun, StreamMode, StreamWriter};
use crate::adk::error::ModelError;
use crate::adk::model::{Content, GenerationConfig, Model};
use futures::StreamExt;
use std::sync::Arc;

/// Standard LLM agent
pub struct LLMAgent {
    pub name: String,
    pub instruction: String,
    pub model: Arc<dyn Model>,
    pub config: Option<GenerationConfig>,
}

impl LLMAgent {
    pub fn new(name: String, instruction: String, model: Arc<dyn Model>) -> Self {
        Self {
            name,
            instruction,
            model,
            config: None,
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// System message, prior conversation, then the new prompt
    fn build_request(&self, input: &AgentInput<'_>) -> Vec<Content> {
        let system = match input.context {
            Some(ctx) => format!("{}\n\n{}", self.instruction, ctx),
            None => self.instruction.clone(),
        };

        let mut request = Vec::with_capacity(input.history.len() + 2);
        request.push(Content::system(system));
        request.extend_from_slice(input.history);
        request.push(Content::user(input.prompt));
        request
    }

    /// Run buffered and return the full response
    pub async fn run(&self, input: AgentInput<'_>) -> Result<AgentRun, ModelError> {
        let request = self.build_request(&input);
        log::info!(
            "Agent {} calling {} with {} prior messages",
            self.name,
            self.model.name(),
            input.history.len()
        );

        let response = self
            .model
            .generate_content(&request, self.config.as_ref())
            .await?;
        let output = response.text_content();

        log::info!(
            "Agent {} received response (length: {})",
            self.name,
            output.len()
        );

        Ok(AgentRun {
            output,
            new_messages: vec![Content::user(input.prompt), response],
        })
    }

    /// Run and forward output to `writer` as it is produced.
    ///
    /// In buffered mode the full text is emitted once after the call
    /// returns; in streamed mode every delta is emitted as it arrives.
    /// Either way the returned run carries the complete text.
    pub async fn run_stream(
        &self,
        input: AgentInput<'_>,
        mode: StreamMode,
        writer: &StreamWriter,
    ) -> Result<AgentRun, ModelError> {
        if mode == StreamMode::Buffered {
            let run = self.run(input).await?;
            writer.emit(run.output.clone()).await;
            return Ok(run);
        }

        let request = self.build_request(&input);
        log::info!(
            "Agent {} streaming from {} with {} prior messages",
            self.name,
            self.model.name(),
            input.history.len()
        );

        let mut stream = self
            .model
            .stream_content(&request, self.config.as_ref())
            .await?;

        let mut output = String::new();
        let mut fragments = 0usize;
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            output.push_str(&fragment);
            fragments += 1;
            writer.emit(fragment).await;
        }

        log::info!(
            "Agent {} streamed {} fragments (length: {})",
            self.name,
            fragments,
            output.len()
        );

        Ok(AgentRun {
            new_messages: vec![Content::user(input.prompt), Content::model(output.clone())],
            output,
        })
    }
}
