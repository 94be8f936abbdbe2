//! Graph workflow executor
//!
//! Walks the node graph for one session at a time. A run starts either at
//! the entry node (`start`) or at the input gate (`resume`) and continues
//! until the session parks again: at `AwaitInput` waiting for the user, or
//! at `End`. The checkpoint is written only when the session parks, so a
//! turn that fails midway leaves the previous checkpoint intact and the
//! same call can simply be retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::types::{NodeId, RunOutcome, SessionStatus, Transition};
use crate::adk::agent::{AgentEvent, StreamWriter};
use crate::adk::error::{DaedalusError, WorkflowError};
use crate::daedalus::workflow::checkpoint::{Checkpoint, CheckpointStore};
use crate::daedalus::workflow::is_valid_session_id;
use crate::daedalus::workflow::nodes::{Node, NodeContext, Router};
use crate::daedalus::workflow::state::{StateUpdate, WorkflowState};

/// The agent-building workflow
pub struct WorkflowGraph {
    scope: Arc<dyn Node>,
    coder: Arc<dyn Node>,
    closer: Arc<dyn Node>,
    router: Router,
    store: Arc<dyn CheckpointStore>,
    /// Serializes runs of the same session; different sessions run freely.
    /// Entries live only while some call holds or waits for them.
    sessions: SessionLocks,
}

type SessionLocks = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Exclusive hold on one session's run lock
struct SessionLease<'a> {
    sessions: &'a SessionLocks,
    session_id: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this lease reference the lock: nobody is waiting
        if Arc::strong_count(&self.lock) == 2 {
            sessions.remove(&self.session_id);
        }
    }
}

impl WorkflowGraph {
    pub fn new(
        scope: Arc<dyn Node>,
        coder: Arc<dyn Node>,
        closer: Arc<dyn Node>,
        router: Router,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            scope,
            coder,
            closer,
            router,
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a session with the user's request and run until the first
    /// suspension. An existing session with the same id is replaced.
    pub async fn start(
        &self,
        session_id: &str,
        message: &str,
        writer: &StreamWriter,
    ) -> Result<RunOutcome, DaedalusError> {
        check_input(session_id, message)?;
        let _lease = self.lease(session_id).await;

        match self.store.load(session_id).await {
            Ok(Some(_)) => log::warn!("Restarting existing session {}", session_id),
            Ok(None) => {}
            Err(e) => log::warn!(
                "Replacing unreadable checkpoint of session {}: {}",
                session_id,
                e
            ),
        }
        log::info!("Starting session {}", session_id);

        let state = WorkflowState::new(message);
        self.drive(session_id, state, NodeId::ENTRY, writer).await
    }

    /// Deliver the next user message to a suspended session and run until
    /// it suspends again or finishes.
    pub async fn resume(
        &self,
        session_id: &str,
        message: &str,
        writer: &StreamWriter,
    ) -> Result<RunOutcome, DaedalusError> {
        check_input(session_id, message)?;
        let _lease = self.lease(session_id).await;

        let checkpoint = self
            .store
            .load(session_id)
            .await?
            .ok_or_else(|| WorkflowError::SessionNotFound(session_id.to_string()))?;

        if checkpoint.next != NodeId::AwaitInput {
            return Err(WorkflowError::NotAwaitingInput {
                session_id: session_id.to_string(),
                next: checkpoint.next.to_string(),
            }
            .into());
        }

        let mut state = checkpoint.state;
        state.apply(StateUpdate::user_message(message.to_string()));

        let route = self.router.route(&state.latest_user_message).await?;
        log::info!("Session {} resumed, routing {:?}", session_id, route);

        self.drive(session_id, state, route.target(), writer).await
    }

    /// Last checkpoint of a session, if any
    pub async fn session(&self, session_id: &str) -> Result<Option<Checkpoint>, DaedalusError> {
        if !is_valid_session_id(session_id) {
            return Err(WorkflowError::InvalidSessionId(session_id.to_string()).into());
        }
        Ok(self.store.load(session_id).await?)
    }

    /// Node implementation for working nodes; `None` for resting points
    fn node(&self, id: NodeId) -> Option<&dyn Node> {
        match id {
            NodeId::DefineScope => Some(self.scope.as_ref()),
            NodeId::RefineCode => Some(self.coder.as_ref()),
            NodeId::CloseConversation => Some(self.closer.as_ref()),
            NodeId::AwaitInput | NodeId::End => None,
        }
    }

    async fn lease(&self, session_id: &str) -> SessionLease<'_> {
        let lock = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.clone().lock_owned().await;
        SessionLease {
            sessions: &self.sessions,
            session_id: session_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn drive(
        &self,
        session_id: &str,
        mut state: WorkflowState,
        from: NodeId,
        writer: &StreamWriter,
    ) -> Result<RunOutcome, DaedalusError> {
        let ctx = NodeContext { session_id, writer };
        let mut current = from;

        loop {
            let (next, node) = match (current.transition(), self.node(current)) {
                (Transition::Goto(next), Some(node)) => (next, node),
                _ => return self.park(session_id, state, current, writer).await,
            };

            debug_assert_eq!(node.id(), current);
            log::info!("Session {}: executing node {}", session_id, current);
            writer
                .send(AgentEvent::NodeStarted(current.to_string()))
                .await;

            let update = node.run(&state, &ctx).await.map_err(|e| {
                log::error!("Session {}: node {} failed: {}", session_id, current, e);
                e
            })?;
            state.apply(update);

            log::info!("Session {}: node {} completed", session_id, current);
            current = next;
        }
    }

    /// Persist the session at a resting point and report it
    async fn park(
        &self,
        session_id: &str,
        state: WorkflowState,
        at: NodeId,
        writer: &StreamWriter,
    ) -> Result<RunOutcome, DaedalusError> {
        let status = at.status().unwrap_or(SessionStatus::AwaitingInput);
        let checkpoint = Checkpoint::new(state, at);
        self.store.save(session_id, &checkpoint).await?;

        log::info!(
            "Session {} parked at {} with {} turns",
            session_id,
            at,
            checkpoint.state.turns()
        );

        writer
            .send(match status {
                SessionStatus::AwaitingInput => AgentEvent::AwaitingInput,
                SessionStatus::Finished => AgentEvent::Finished,
            })
            .await;

        Ok(RunOutcome {
            status,
            state: checkpoint.state,
        })
    }
}

fn check_input(session_id: &str, message: &str) -> Result<(), WorkflowError> {
    if !is_valid_session_id(session_id) {
        return Err(WorkflowError::InvalidSessionId(session_id.to_string()));
    }
    if message.trim().is_empty() {
        return Err(WorkflowError::EmptyMessage);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::agent::{LLMAgent, StreamMode};
    use crate::adk::error::ModelError;
    use crate::daedalus::docs::StaticDocs;
    use crate::daedalus::workflow::checkpoint::{FileCheckpointStore, MemoryCheckpointStore};
    use crate::daedalus::workflow::nodes::{CodeRefiner, ConversationCloser, ScopeDefiner};
    use crate::daedalus::workflow::prompts;
    use crate::daedalus::workflow::state::reconstruct_history;
    use crate::daedalus::workflow::testing::ScriptedModel;
    use tokio::sync::mpsc;

    struct Harness {
        graph: WorkflowGraph,
        reasoner: Arc<ScriptedModel>,
        coder: Arc<ScriptedModel>,
        router: Arc<ScriptedModel>,
        closer: Arc<ScriptedModel>,
        store: MemoryCheckpointStore,
    }

    fn harness() -> Harness {
        let reasoner = ScriptedModel::new("reasoner", &[]);
        let coder = ScriptedModel::new("coder", &[]);
        let router = ScriptedModel::new("router", &[]);
        let closer = ScriptedModel::new("closer", &[]);
        let store = MemoryCheckpointStore::new();
        let graph = build_graph(
            [&reasoner, &coder, &router, &closer],
            Arc::new(store.clone()),
        );

        Harness {
            graph,
            reasoner,
            coder,
            router,
            closer,
            store,
        }
    }

    fn build_graph(
        [reasoner, coder, router, closer]: [&Arc<ScriptedModel>; 4],
        store: Arc<dyn CheckpointStore>,
    ) -> WorkflowGraph {
        WorkflowGraph::new(
            Arc::new(ScopeDefiner::new(
                LLMAgent::new("reasoner".into(), prompts::SCOPE_SYSTEM_PROMPT.into(), reasoner.clone()),
                Arc::new(StaticDocs::default()),
                None,
            )),
            Arc::new(CodeRefiner::new(
                LLMAgent::new("coder".into(), prompts::CODER_SYSTEM_PROMPT.into(), coder.clone()),
                StreamMode::Streamed,
            )),
            Arc::new(ConversationCloser::new(
                LLMAgent::new("closer".into(), prompts::CLOSER_SYSTEM_PROMPT.into(), closer.clone()),
                StreamMode::Streamed,
            )),
            Router::new(LLMAgent::new(
                "router".into(),
                prompts::ROUTER_SYSTEM_PROMPT.into(),
                router.clone(),
            )),
            store,
        )
    }

    #[tokio::test]
    async fn test_start_defines_scope_then_refines_then_suspends() {
        let h = harness();
        h.reasoner.push_reply("# Weather agent scope");
        h.coder.push_reply("weather_agent = Agent(...)");

        let (tx, mut rx) = mpsc::channel(64);
        let writer = StreamWriter::new(tx);
        let outcome = h
            .graph
            .start("s1", "Build a weather-lookup agent", &writer)
            .await
            .unwrap();
        drop(writer);

        assert_eq!(outcome.status, SessionStatus::AwaitingInput);
        assert_eq!(outcome.state.scope, "# Weather agent scope");
        assert_eq!(outcome.state.message_history.len(), 1);
        assert_eq!(h.reasoner.calls(), 1);
        assert_eq!(h.coder.calls(), 1);
        assert_eq!(h.router.calls(), 0);

        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        assert_eq!(events[0], AgentEvent::NodeStarted("define_scope".into()));
        assert_eq!(events[1], AgentEvent::NodeStarted("refine_code".into()));
        assert_eq!(events.last(), Some(&AgentEvent::AwaitingInput));
        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Delta(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, "weather_agent = Agent(...)");

        let checkpoint = h.store.load("s1").await.unwrap().unwrap();
        assert_eq!(checkpoint.next, NodeId::AwaitInput);
        assert_eq!(checkpoint.state, outcome.state);
    }

    #[tokio::test]
    async fn test_n_continues_then_finish() {
        let h = harness();
        let n = 3;
        h.reasoner.push_reply("scope");
        for i in 0..=n {
            h.coder.push_reply(&format!("version {}", i));
        }
        for _ in 0..n {
            h.router.push_reply("coder_agent");
        }
        h.router.push_reply("finish_conversation");
        h.closer.push_reply("Goodbye!");

        let writer = StreamWriter::disabled();
        h.graph.start("s1", "Build it", &writer).await.unwrap();
        for i in 0..n {
            let outcome = h
                .graph
                .resume("s1", &format!("change {}", i), &writer)
                .await
                .unwrap();
            assert_eq!(outcome.status, SessionStatus::AwaitingInput);
        }
        let outcome = h.graph.resume("s1", "done, thanks", &writer).await.unwrap();

        assert_eq!(outcome.status, SessionStatus::Finished);
        assert_eq!(h.reasoner.calls(), 1);
        assert_eq!(h.coder.calls(), n + 1);
        assert_eq!(h.closer.calls(), 1);
        assert_eq!(outcome.state.message_history.len(), n + 2);

        let history = reconstruct_history(&outcome.state.message_history).unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.text_content(), "Goodbye!");
        assert_eq!(history[2].text_content(), "change 0");
    }

    #[tokio::test]
    async fn test_malformed_route_continues() {
        let h = harness();
        h.reasoner.push_reply("scope");
        h.coder.push_reply("v1");
        h.coder.push_reply("v2");
        h.router.push_reply("maybe?");

        let writer = StreamWriter::disabled();
        h.graph.start("s1", "Build it", &writer).await.unwrap();
        let outcome = h.graph.resume("s1", "hmm", &writer).await.unwrap();

        assert_eq!(outcome.status, SessionStatus::AwaitingInput);
        assert_eq!(h.coder.calls(), 2);
        assert_eq!(h.closer.calls(), 0);
    }

    #[tokio::test]
    async fn test_resume_unknown_session() {
        let h = harness();
        let err = h
            .graph
            .resume("ghost", "hello", &StreamWriter::disabled())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaedalusError::Workflow(WorkflowError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resume_after_finish_is_rejected() {
        let h = harness();
        h.reasoner.push_reply("scope");
        h.coder.push_reply("v1");
        h.router.push_reply("finish_conversation");
        h.closer.push_reply("bye");

        let writer = StreamWriter::disabled();
        h.graph.start("s1", "Build it", &writer).await.unwrap();
        h.graph.resume("s1", "done", &writer).await.unwrap();

        let err = h.graph.resume("s1", "wait", &writer).await.unwrap_err();
        assert!(matches!(
            err,
            DaedalusError::Workflow(WorkflowError::NotAwaitingInput { .. })
        ));
        assert_eq!(h.router.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_last_checkpoint() {
        let h = harness();
        h.reasoner.push_reply("scope");
        h.coder.push_reply("v1");
        h.router.push_reply("coder_agent");
        h.coder.push_failure("quota exceeded");

        let writer = StreamWriter::disabled();
        h.graph.start("s1", "Build it", &writer).await.unwrap();
        let before = h.store.load("s1").await.unwrap().unwrap();

        let err = h.graph.resume("s1", "add caching", &writer).await.unwrap_err();
        assert!(matches!(err, DaedalusError::Model(ModelError::Api { .. })));
        assert!(!err.is_corruption());
        assert_eq!(h.store.load("s1").await.unwrap().unwrap(), before);

        // Retrying the same message works from the untouched checkpoint
        h.router.push_reply("coder_agent");
        h.coder.push_reply("v2");
        let outcome = h.graph.resume("s1", "add caching", &writer).await.unwrap();
        assert_eq!(outcome.state.message_history.len(), 2);
        assert_eq!(outcome.state.latest_user_message, "add caching");
    }

    #[tokio::test]
    async fn test_router_failure_aborts_turn() {
        let h = harness();
        h.reasoner.push_reply("scope");
        h.coder.push_reply("v1");
        h.router.push_failure("timeout");

        let writer = StreamWriter::disabled();
        h.graph.start("s1", "Build it", &writer).await.unwrap();
        assert!(h.graph.resume("s1", "next", &writer).await.is_err());
        assert_eq!(h.coder.calls(), 1);

        let checkpoint = h.store.load("s1").await.unwrap().unwrap();
        assert_eq!(checkpoint.state.latest_user_message, "Build it");
    }

    #[tokio::test]
    async fn test_rejects_empty_message_and_bad_session_id() {
        let h = harness();
        let writer = StreamWriter::disabled();

        let err = h.graph.start("s1", "   ", &writer).await.unwrap_err();
        assert!(matches!(err, DaedalusError::Workflow(WorkflowError::EmptyMessage)));

        let err = h.graph.start("../etc", "hi", &writer).await.unwrap_err();
        assert!(matches!(
            err,
            DaedalusError::Workflow(WorkflowError::InvalidSessionId(_))
        ));
        assert_eq!(h.reasoner.calls(), 0);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let h = harness();
        // Replies are shared by both sessions, in whatever order they run
        h.reasoner.push_reply("scope");
        h.reasoner.push_reply("scope");
        h.coder.push_reply("code");
        h.coder.push_reply("code");

        let writer = StreamWriter::disabled();
        let (a, b) = tokio::join!(
            h.graph.start("alpha", "first agent", &writer),
            h.graph.start("beta", "second agent", &writer),
        );

        assert_eq!(a.unwrap().state.latest_user_message, "first agent");
        assert_eq!(b.unwrap().state.latest_user_message, "second agent");
        assert_eq!(h.store.len().await, 2);
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_rejected_resumes() {
        let h = harness();
        let writer = StreamWriter::disabled();
        for i in 0..100 {
            let session_id = format!("ghost-{}", i);
            assert!(h.graph.resume(&session_id, "hello", &writer).await.is_err());
        }
        assert_eq!(h.graph.lock_entries(), 0);
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_each_run() {
        let h = harness();
        h.reasoner.push_reply("scope");
        h.coder.push_reply("v1");
        h.router.push_reply("finish_conversation");
        h.closer.push_reply("bye");

        let writer = StreamWriter::disabled();
        h.graph.start("s1", "Build it", &writer).await.unwrap();
        assert_eq!(h.graph.lock_entries(), 0);

        let outcome = h.graph.resume("s1", "done", &writer).await.unwrap();
        assert_eq!(outcome.status, SessionStatus::Finished);
        assert_eq!(h.graph.lock_entries(), 0);
    }

    #[tokio::test]
    async fn test_same_session_runs_are_serialized() {
        let h = harness();
        h.reasoner.push_reply("scope");
        h.coder.push_reply("v1");
        let writer = StreamWriter::disabled();
        h.graph.start("s1", "Build it", &writer).await.unwrap();

        h.router.push_reply("coder_agent");
        h.router.push_reply("coder_agent");
        h.coder.push_reply("v2");
        h.coder.push_reply("v3");
        let (a, b) = tokio::join!(
            h.graph.resume("s1", "first change", &writer),
            h.graph.resume("s1", "second change", &writer),
        );
        a.unwrap();
        b.unwrap();

        // Neither turn overwrote the other
        let checkpoint = h.store.load("s1").await.unwrap().unwrap();
        assert_eq!(checkpoint.state.message_history.len(), 3);
        assert_eq!(h.graph.lock_entries(), 0);
    }

    #[tokio::test]
    async fn test_start_replaces_unreadable_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s1.json"), "{ not json").unwrap();

        let reasoner = ScriptedModel::new("reasoner", &["scope"]);
        let coder = ScriptedModel::new("coder", &["v1"]);
        let router = ScriptedModel::new("router", &[]);
        let closer = ScriptedModel::new("closer", &[]);
        let graph = build_graph(
            [&reasoner, &coder, &router, &closer],
            Arc::new(FileCheckpointStore::new(dir.path())),
        );

        let outcome = graph
            .start("s1", "Build it", &StreamWriter::disabled())
            .await
            .unwrap();
        assert_eq!(outcome.status, SessionStatus::AwaitingInput);

        let checkpoint = graph.session("s1").await.unwrap().unwrap();
        assert_eq!(checkpoint.state, outcome.state);
    }
}
