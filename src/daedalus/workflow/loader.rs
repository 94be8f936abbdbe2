//! Config loader - YAML file loading and parsing
//!
//! Loads `WorkflowConfig` from YAML, then layers environment overrides on top.

use super::types::WorkflowConfig;
use crate::adk::error::DaedalusError;
use std::fs;
use std::path::Path;

/// Loads workflow configuration from YAML files
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a configuration from a YAML file
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowConfig, DaedalusError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DaedalusError::config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::parse_yaml(&content)
    }

    /// Parse a configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<WorkflowConfig, DaedalusError> {
        if content.trim().is_empty() {
            return Ok(WorkflowConfig::default());
        }
        let config: WorkflowConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// File (if any), then environment, then validation
    pub fn resolve(&self, path: Option<&Path>) -> Result<WorkflowConfig, DaedalusError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                self.load_config(path)?
            }
            None => WorkflowConfig::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
