// SPDX-License-Identifier: MIT

//! Scope definition node

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Node, NodeContext};
use crate::adk::agent::{AgentInput, LLMAgent};
use crate::adk::error::{DaedalusError, ModelError};
use crate::daedalus::docs::DocumentationSource;
use crate::daedalus::workflow::graph::types::NodeId;
use crate::daedalus::workflow::prompts;
use crate::daedalus::workflow::state::{StateUpdate, WorkflowState};

/// Writes the scope document from the opening request
pub struct ScopeDefiner {
    agent: LLMAgent,
    docs: Arc<dyn DocumentationSource>,
    /// Audit copies go to `<workbench>/<session_id>/scope.md`; `None` disables them
    workbench: Option<PathBuf>,
}

impl ScopeDefiner {
    pub fn new(
        agent: LLMAgent,
        docs: Arc<dyn DocumentationSource>,
        workbench: Option<PathBuf>,
    ) -> Self {
        Self {
            agent,
            docs,
            workbench,
        }
    }

    pub fn audit_path(workbench: &Path, session_id: &str) -> PathBuf {
        workbench.join(session_id).join("scope.md")
    }

    async fn documentation_pages(&self) -> Vec<String> {
        match self.docs.list_documentation_pages().await {
            Ok(pages) => pages,
            Err(e) => {
                log::warn!("Documentation lookup failed, scoping without it: {}", e);
                Vec::new()
            }
        }
    }

    /// Best-effort copy of the scope on disk
    async fn write_audit(&self, session_id: &str, scope: &str) {
        let Some(workbench) = &self.workbench else {
            return;
        };
        let path = Self::audit_path(workbench, session_id);

        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, scope).await
        }
        .await;

        match result {
            Ok(()) => log::info!("Scope written to {:?}", path),
            Err(e) => log::warn!("Failed to write scope to {:?}: {}", path, e),
        }
    }
}

#[async_trait]
impl Node for ScopeDefiner {
    fn id(&self) -> NodeId {
        NodeId::DefineScope
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, DaedalusError> {
        let pages = self.documentation_pages().await;
        let prompt = prompts::build_scope_prompt(&state.latest_user_message, &pages);

        let run = self.agent.run(AgentInput::new(&prompt, &[])).await?;
        if run.output.trim().is_empty() {
            return Err(ModelError::InvalidResponse("Reasoner returned an empty scope".into()).into());
        }

        self.write_audit(ctx.session_id, &run.output).await;
        Ok(StateUpdate::scope(run.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::agent::StreamWriter;
    use crate::adk::model::{Content, GenerationConfig, Model};
    use crate::daedalus::docs::StaticDocs;
    use std::sync::Mutex;

    struct FixedModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Model for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
        ) -> Result<Content, ModelError> {
            let last = history.last().map(Content::text_content).unwrap_or_default();
            self.prompts.lock().unwrap().push(last);
            Ok(Content::model(self.reply.clone()))
        }
    }

    struct FailingDocs;

    #[async_trait]
    impl DocumentationSource for FailingDocs {
        async fn list_documentation_pages(&self) -> Result<Vec<String>, DaedalusError> {
            Err(DaedalusError::docs("connection refused"))
        }
    }

    fn definer(
        reply: &str,
        docs: Arc<dyn DocumentationSource>,
        workbench: Option<PathBuf>,
    ) -> (ScopeDefiner, Arc<FixedModel>) {
        let model = Arc::new(FixedModel {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let agent = LLMAgent::new(
            "reasoner".into(),
            prompts::SCOPE_SYSTEM_PROMPT.into(),
            model.clone(),
        );
        (ScopeDefiner::new(agent, docs, workbench), model)
    }

    #[tokio::test]
    async fn test_scope_update_and_audit_file() {
        let dir = tempfile::tempdir().unwrap();
        let docs = Arc::new(StaticDocs::new(vec!["https://ai.pydantic.dev/agents/".into()]));
        let (node, model) = definer("# Scope", docs, Some(dir.path().to_path_buf()));
        let writer = StreamWriter::disabled();
        let ctx = NodeContext {
            session_id: "s1",
            writer: &writer,
        };

        let update = node
            .run(&WorkflowState::new("Build a weather-lookup agent"), &ctx)
            .await
            .unwrap();

        assert_eq!(update, StateUpdate::scope("# Scope".to_string()));
        let written =
            std::fs::read_to_string(ScopeDefiner::audit_path(dir.path(), "s1")).unwrap();
        assert_eq!(written, "# Scope");

        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Build a weather-lookup agent"));
        assert!(prompt.contains("https://ai.pydantic.dev/agents/"));
    }

    #[tokio::test]
    async fn test_audit_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the workbench directory should be
        let blocked = dir.path().join("workbench");
        std::fs::write(&blocked, b"").unwrap();

        let (node, _) = definer("# Scope", Arc::new(StaticDocs::default()), Some(blocked));
        let writer = StreamWriter::disabled();
        let ctx = NodeContext {
            session_id: "s1",
            writer: &writer,
        };

        let update = node.run(&WorkflowState::new("x"), &ctx).await.unwrap();
        assert_eq!(update.scope.as_deref(), Some("# Scope"));
    }

    #[tokio::test]
    async fn test_docs_failure_is_not_fatal() {
        let (node, _) = definer("# Scope", Arc::new(FailingDocs), None);
        let writer = StreamWriter::disabled();
        let ctx = NodeContext {
            session_id: "s1",
            writer: &writer,
        };

        assert!(node.run(&WorkflowState::new("x"), &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_scope_is_rejected() {
        let (node, _) = definer("  \n", Arc::new(StaticDocs::default()), None);
        let writer = StreamWriter::disabled();
        let ctx = NodeContext {
            session_id: "s1",
            writer: &writer,
        };

        let err = node.run(&WorkflowState::new("x"), &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            DaedalusError::Model(ModelError::InvalidResponse(_))
        ));
    }
}
