// SPDX-License-Identifier: MIT

//! JSON-file checkpoint store: one `<session_id>.json` per session

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use super::{Checkpoint, CheckpointStore};
use crate::adk::error::CheckpointError;
use crate::daedalus::workflow::is_valid_session_id;

pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Session ids become file names, so only a safe alphabet is accepted
    fn path_for(&self, session_id: &str) -> Result<PathBuf, CheckpointError> {
        if !is_valid_session_id(session_id) {
            return Err(CheckpointError::InvalidSessionId(session_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", session_id)))
    }

    fn io_error(session_id: &str, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            session_id: session_id.to_string(),
            source,
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, session_id: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let path = self.path_for(session_id)?;
        let body = serde_json::to_vec_pretty(checkpoint).map_err(|source| CheckpointError::Serde {
            session_id: session_id.to_string(),
            source,
        })?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_error(session_id, e))?;

        // Write then rename so a crash never leaves a half-written checkpoint
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .await
            .map_err(|e| Self::io_error(session_id, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(session_id, e))?;

        log::debug!("Saved checkpoint for session {} to {:?}", session_id, path);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(session_id)?;
        let body = match fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(session_id, e)),
        };

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| CheckpointError::Serde {
                session_id: session_id.to_string(),
                source,
            })
    }
}
