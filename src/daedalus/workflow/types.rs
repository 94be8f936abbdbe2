// SPDX-License-Identifier: MIT

//! YAML schema types for the workflow configuration
//!
//! Every section has defaults, so an empty file (or no file at all) is a
//! valid configuration once the environment supplies the secrets.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::adk::agent::StreamMode;
use crate::adk::error::DaedalusError;
use crate::adk::model::GenerationConfig;
use crate::daedalus::docs::supabase::DEFAULT_SOURCE;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REASONER_MODEL: &str = "mistral:7b-instruct";
pub const DEFAULT_PRIMARY_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_WORKBENCH: &str = "workbench";

/// Top-level workflow configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct WorkflowConfig {
    pub model: ModelSettings,
    pub docs: DocsSettings,
    pub storage: StorageSettings,
}

/// Model endpoint and model names
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model used to write the scope document
    pub reasoner_model: String,
    /// Model used by the coder, router and closer
    pub primary_model: String,
    /// Explicit stream mode; inferred from `base_url` when absent
    pub stream_mode: Option<StreamMode>,
    pub parameters: Option<GenerationConfig>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            reasoner_model: DEFAULT_REASONER_MODEL.to_string(),
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            stream_mode: None,
            parameters: None,
        }
    }
}

/// Documentation index settings.
///
/// With Supabase credentials the page list is queried live; otherwise the
/// static `pages` list is used.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DocsSettings {
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub source: String,
    pub pages: Vec<String>,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_service_key: None,
            source: DEFAULT_SOURCE.to_string(),
            pages: Vec::new(),
        }
    }
}

/// Where scope audits and checkpoints live
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    /// Scope audit directory; `None` disables the audit file
    pub workbench: Option<PathBuf>,
    /// Checkpoint directory; `None` keeps checkpoints in memory
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            workbench: Some(PathBuf::from(DEFAULT_WORKBENCH)),
            checkpoint_dir: None,
        }
    }
}

impl WorkflowConfig {
    /// Override fields from the process environment
    pub fn apply_env(&mut self) -> Result<(), DaedalusError> {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Override fields from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), DaedalusError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BASE_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = lookup("LLM_API_KEY") {
            self.model.api_key = Some(v);
        }
        if let Some(v) = lookup("REASONER_MODEL") {
            self.model.reasoner_model = v;
        }
        if let Some(v) = lookup("PRIMARY_MODEL") {
            self.model.primary_model = v;
        }
        if let Some(v) = lookup("DAEDALUS_STREAM_MODE") {
            self.model.stream_mode = Some(parse_stream_mode(&v)?);
        }
        if let Some(v) = lookup("SUPABASE_URL") {
            self.docs.supabase_url = Some(v);
        }
        if let Some(v) = lookup("SUPABASE_SERVICE_KEY") {
            self.docs.supabase_service_key = Some(v);
        }
        if let Some(v) = lookup("DAEDALUS_WORKBENCH") {
            self.storage.workbench = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DAEDALUS_CHECKPOINT_DIR") {
            self.storage.checkpoint_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Effective stream mode: explicit setting, else inferred from the endpoint
    pub fn stream_mode(&self) -> StreamMode {
        self.model
            .stream_mode
            .unwrap_or_else(|| StreamMode::for_base_url(&self.model.base_url))
    }

    pub fn validate(&self) -> Result<(), DaedalusError> {
        url::Url::parse(&self.model.base_url).map_err(|e| {
            DaedalusError::config(format!("Invalid base_url '{}': {}", self.model.base_url, e))
        })?;
        if let Some(supabase_url) = &self.docs.supabase_url {
            url::Url::parse(supabase_url).map_err(|e| {
                DaedalusError::config(format!("Invalid supabase_url '{}': {}", supabase_url, e))
            })?;
        }
        if self.model.reasoner_model.trim().is_empty() || self.model.primary_model.trim().is_empty()
        {
            return Err(DaedalusError::config("Model names must not be empty"));
        }
        Ok(())
    }
}

fn parse_stream_mode(value: &str) -> Result<StreamMode, DaedalusError> {
    match value.trim().to_lowercase().as_str() {
        "buffered" => Ok(StreamMode::Buffered),
        "streamed" => Ok(StreamMode::Streamed),
        other => Err(DaedalusError::config(format!(
            "DAEDALUS_STREAM_MODE must be 'buffered' or 'streamed', got '{}'",
            other
        ))),
    }
}
