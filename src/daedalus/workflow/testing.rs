//! Scripted test doubles shared by the workflow unit tests

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::adk::error::ModelError;
use crate::adk::model::{Content, GenerationConfig, Model, TextStream};

/// Model that replays queued replies and records every request.
///
/// Streamed replies are split after each space so tests see several
/// fragments per turn.
pub struct ScriptedModel {
    name: String,
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Vec<Content>>>,
}

impl ScriptedModel {
    pub fn new(name: &str, replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    /// Queue a transport failure
    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<Content>> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, history: &[Content]) -> Result<String, ModelError> {
        self.requests.lock().unwrap().push(history.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ModelError::api(&self.name, message)),
            None => Err(ModelError::InvalidResponse(format!(
                "{} has no scripted reply left",
                self.name
            ))),
        }
    }
}

#[async_trait]
impl Model for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(
        &self,
        history: &[Content],
        _config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        self.next_reply(history).map(Content::model)
    }

    async fn stream_content(
        &self,
        history: &[Content],
        _config: Option<&GenerationConfig>,
    ) -> Result<TextStream, ModelError> {
        let reply = self.next_reply(history)?;
        let fragments: Vec<Result<String, ModelError>> = reply
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(stream::iter(fragments).boxed())
    }
}
