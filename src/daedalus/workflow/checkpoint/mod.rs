// SPDX-License-Identifier: MIT

//! Checkpoint persistence
//!
//! A checkpoint is the session state plus the node the session is parked
//! at. Stores must round-trip both unchanged, history batches included.

mod file;

pub use file::FileCheckpointStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adk::error::CheckpointError;
use crate::daedalus::workflow::graph::types::NodeId;
use crate::daedalus::workflow::state::WorkflowState;

/// Persisted snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub state: WorkflowState,
    /// Node to run when the session continues
    pub next: NodeId,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(state: WorkflowState, next: NodeId) -> Self {
        Self {
            state,
            next,
            updated_at: Utc::now(),
        }
    }
}

/// Durable key-value storage for checkpoints, keyed by session id
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, session_id: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;
}

/// Process-local store for tests and short-lived sessions
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.checkpoints.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, session_id: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.insert(session_id.to_string(), checkpoint.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(session_id).cloned())
    }
}
