// SPDX-License-Identifier: MIT

//! OpenAI Model - chat-completions API implementation
//!
//! Works against any OpenAI-compatible endpoint, including a local Ollama
//! server, by pointing `base_url` at it.

use super::{Content, GenerationConfig, Model, Part, TextStream};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

const PROVIDER: &str = "openai";

/// OpenAI-compatible chat model
pub struct OpenAIModel {
    client: Client,
    api_key: Option<String>,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel.
    ///
    /// `api_key` may be `None` for local servers that do not check it.
    pub fn new(model_name: String, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Hosted endpoints need a key; local servers do not check it
    pub fn requires_api_key(base_url: &str) -> bool {
        !base_url.to_lowercase().contains("localhost")
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> Value {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        json!({
            "role": role,
            "content": content.text_content()
        })
    }

    fn build_body(&self, history: &[Content], config: Option<&GenerationConfig>, stream: bool) -> Value {
        let messages: Vec<Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "stream": stream
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        body
    }

    fn request(&self, body: &Value) -> RequestBuilder {
        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        req
    }

    /// Map non-success statuses to typed errors
    async fn check_status(resp: Response) -> Result<Response, ModelError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ModelError::RateLimited { retry_after_secs });
        }
        let text = resp.text().await?;
        Err(ModelError::api(PROVIDER, format!("{}: {}", status, text)))
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &Value) -> Result<Content, ModelError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No choices in OpenAI response".into()))?;

        let message = &choice["message"];
        let mut parts = Vec::new();

        // Reasoning models served through Ollama/DeepSeek expose this field
        if let Some(reasoning) = message["reasoning_content"].as_str() {
            if !reasoning.is_empty() {
                parts.push(Part::Thinking(reasoning.to_string()));
            }
        }

        if let Some(content) = message["content"].as_str() {
            parts.push(Part::Text(content.to_string()));
        }

        if parts.is_empty() {
            return Err(ModelError::InvalidResponse(
                "Response message has no content".into(),
            ));
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }

    /// Extract the text delta from one SSE `data:` payload.
    ///
    /// Returns `Ok(None)` for the `[DONE]` sentinel and for chunks that carry
    /// no content (role announcements, finish reasons).
    fn parse_stream_chunk(data: &str) -> Result<Option<String>, ModelError> {
        if data == "[DONE]" {
            return Ok(None);
        }
        let chunk: Value = serde_json::from_str(data)?;
        if let Some(err) = chunk.get("error") {
            return Err(ModelError::api(PROVIDER, err.to_string()));
        }
        Ok(chunk["choices"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|c| c["delta"]["content"].as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }
}

/// Splits a server-sent-events byte stream into `data:` payloads.
///
/// Network chunks may cut lines, and multi-byte characters, anywhere, so
/// raw bytes are buffered and only complete lines are decoded.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            payloads.extend(Self::payload(&line));
        }
        payloads
    }

    /// Payload of a trailing line the server never terminated
    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::payload(&line)
    }

    fn payload(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        line.strip_prefix("data:")
            .map(|data| data.trim_start().to_string())
    }
}

#[async_trait]
impl Model for OpenAIModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let body = self.build_body(history, config, false);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = Self::check_status(self.request(&body).send().await?).await?;
        let resp_json: Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }

    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<TextStream, ModelError> {
        let body = self.build_body(history, config, true);
        log::debug!("OpenAI streaming request for model {}", self.model_name);

        let resp = Self::check_status(self.request(&body).send().await?).await?;

        let mut decoder = SseDecoder::default();
        let fragments = resp
            .bytes_stream()
            .map(Some)
            .chain(stream::once(async { None }))
            .map(move |chunk| -> Vec<Result<String, ModelError>> {
                let payloads = match chunk {
                    Some(Ok(bytes)) => decoder.push(&bytes),
                    Some(Err(e)) => return vec![Err(ModelError::from(e))],
                    None => decoder.finish().into_iter().collect(),
                };
                payloads
                    .iter()
                    .filter_map(|data| Self::parse_stream_chunk(data).transpose())
                    .collect()
            })
            .flat_map(stream::iter);

        Ok(fragments.boxed())
    }
}
