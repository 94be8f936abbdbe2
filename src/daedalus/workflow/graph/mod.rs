// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! This module provides the node graph and the executor that walks it,
//! suspending at the input gate and resuming from checkpoints.

pub mod executor;
pub mod types;

pub use executor::WorkflowGraph;
pub use types::{NodeId, Route, RunOutcome, SessionStatus, Transition};
