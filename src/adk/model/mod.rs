// SPDX-License-Identifier: MIT

//! Model module - defines LLM model trait and implementations
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [openai] - any OpenAI-compatible chat-completions endpoint (OpenAI, Ollama, vLLM, ...)

pub mod openai;

use crate::adk::error::ModelError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Reasoning content from thinking models, kept for history but never shown as output
    Thinking(String),
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self::text("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text("model", text)
    }

    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated visible text of this message (thinking parts excluded)
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect()
    }
}

/// Ordered, finite stream of text fragments from a streaming completion
pub type TextStream = BoxStream<'static, Result<String, ModelError>>;

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Model identifier, used for logging
    fn name(&self) -> &str;

    /// Run a completion and wait for the whole response
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError>;

    /// Run a completion and yield text deltas as they are produced.
    ///
    /// Models without native streaming fall back to a single fragment
    /// carrying the full response.
    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<TextStream, ModelError> {
        let content = self.generate_content(history, config).await?;
        Ok(stream::once(async move { Ok(content.text_content()) }).boxed())
    }
}
