// SPDX-License-Identifier: MIT

//! Workflow builder - wires models, docs and storage into a graph
//!
//! Every external client is built once here and handed to the nodes that
//! need it; nothing in the workflow reaches for globals.

use std::path::Path;
use std::sync::Arc;

use crate::adk::agent::LLMAgent;
use crate::adk::error::{DaedalusError, ModelError};
use crate::adk::model::openai::OpenAIModel;
use crate::adk::model::Model;
use crate::daedalus::docs::{DocumentationSource, StaticDocs, SupabaseDocs};
use crate::daedalus::workflow::checkpoint::{
    CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
};
use crate::daedalus::workflow::graph::WorkflowGraph;
use crate::daedalus::workflow::loader::ConfigLoader;
use crate::daedalus::workflow::nodes::{CodeRefiner, ConversationCloser, Router, ScopeDefiner};
use crate::daedalus::workflow::prompts;
use crate::daedalus::workflow::types::WorkflowConfig;

/// Builds a ready-to-run `WorkflowGraph` from configuration
pub struct Builder {
    loader: ConfigLoader,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
        }
    }

    /// Resolve configuration (file, then environment) and build the graph
    pub fn build_from_file(&self, path: Option<&Path>) -> Result<WorkflowGraph, DaedalusError> {
        let config = self.loader.resolve(path)?;
        self.build(&config)
    }

    /// Build the graph with real clients for everything in `config`
    pub fn build(&self, config: &WorkflowConfig) -> Result<WorkflowGraph, DaedalusError> {
        let reasoner = self.create_model(config, &config.model.reasoner_model)?;
        let primary = self.create_model(config, &config.model.primary_model)?;
        let docs = self.create_docs(config)?;
        let store = self.create_store(config);
        Ok(self.assemble(config, reasoner, primary, docs, store))
    }

    /// Build the graph around caller-supplied clients
    pub fn assemble(
        &self,
        config: &WorkflowConfig,
        reasoner: Arc<dyn Model>,
        primary: Arc<dyn Model>,
        docs: Arc<dyn DocumentationSource>,
        store: Arc<dyn CheckpointStore>,
    ) -> WorkflowGraph {
        let mode = config.stream_mode();
        let agent = |name: &str, instruction: &str, model: &Arc<dyn Model>| {
            let agent = LLMAgent::new(name.to_string(), instruction.to_string(), model.clone());
            match &config.model.parameters {
                Some(params) => agent.with_config(params.clone()),
                None => agent,
            }
        };

        log::info!(
            "Building workflow: reasoner={}, primary={}, stream_mode={:?}",
            reasoner.name(),
            primary.name(),
            mode
        );

        WorkflowGraph::new(
            Arc::new(ScopeDefiner::new(
                agent("reasoner", prompts::SCOPE_SYSTEM_PROMPT, &reasoner),
                docs,
                config.storage.workbench.clone(),
            )),
            Arc::new(CodeRefiner::new(
                agent("coder", prompts::CODER_SYSTEM_PROMPT, &primary),
                mode,
            )),
            Arc::new(ConversationCloser::new(
                agent("closer", prompts::CLOSER_SYSTEM_PROMPT, &primary),
                mode,
            )),
            Router::new(agent("router", prompts::ROUTER_SYSTEM_PROMPT, &primary)),
            store,
        )
    }

    fn create_model(
        &self,
        config: &WorkflowConfig,
        model_name: &str,
    ) -> Result<Arc<dyn Model>, DaedalusError> {
        let base_url = &config.model.base_url;
        let api_key = config.model.api_key.clone();
        if api_key.is_none() && OpenAIModel::requires_api_key(base_url) {
            return Err(ModelError::ApiKeyMissing("LLM_API_KEY".to_string()).into());
        }
        log::debug!("Using model '{}' at {}", model_name, base_url);
        Ok(Arc::new(OpenAIModel::new(
            model_name.to_string(),
            base_url.clone(),
            api_key,
        )))
    }

    fn create_docs(
        &self,
        config: &WorkflowConfig,
    ) -> Result<Arc<dyn DocumentationSource>, DaedalusError> {
        match (&config.docs.supabase_url, &config.docs.supabase_service_key) {
            (Some(url), Some(key)) => {
                log::info!("Documentation index: Supabase at {}", url);
                let docs = SupabaseDocs::new(url, key.clone())?.with_source(&config.docs.source);
                Ok(Arc::new(docs))
            }
            (Some(_), None) => Err(DaedalusError::config(
                "SUPABASE_URL is set but SUPABASE_SERVICE_KEY is missing",
            )),
            _ => {
                log::info!(
                    "Documentation index: {} static pages",
                    config.docs.pages.len()
                );
                Ok(Arc::new(StaticDocs::new(config.docs.pages.clone())))
            }
        }
    }

    fn create_store(&self, config: &WorkflowConfig) -> Arc<dyn CheckpointStore> {
        match &config.storage.checkpoint_dir {
            Some(dir) => {
                log::info!("Checkpoints stored in {}", dir.display());
                Arc::new(FileCheckpointStore::new(dir.clone()))
            }
            None => {
                log::info!("Checkpoints kept in memory");
                Arc::new(MemoryCheckpointStore::new())
            }
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
