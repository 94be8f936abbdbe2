// SPDX-License-Identifier: MIT

//! State management for the agent-building workflow
//!
//! This module provides:
//! - `WorkflowState` - the persisted per-session state
//! - `StateUpdate` - partial updates nodes return, merged by `WorkflowState::apply`
//! - `MessageBatch` - opaque serialized messages of one agent turn

mod batch;
mod store;

pub use batch::{reconstruct_history, MessageBatch};
pub use store::{StateUpdate, WorkflowState};
