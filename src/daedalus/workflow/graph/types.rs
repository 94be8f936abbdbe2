//! Graph type definitions
//!
//! The node set and its edges. Transitions are pure so the shape of the
//! graph can be checked without running any model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::daedalus::workflow::state::WorkflowState;

/// Nodes of the agent-building graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    /// Reasoner writes the scope document (entry node)
    DefineScope,
    /// Coder produces or refines the agent
    RefineCode,
    /// Interrupt: wait for the next user message
    AwaitInput,
    /// Closer explains how to run the agent and says goodbye
    CloseConversation,
    /// Terminal state
    End,
}

/// Outgoing edge of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Unconditional edge
    Goto(NodeId),
    /// Suspend until resumed with user input, then branch on `Route`
    Suspend,
    /// No outgoing edges
    Halt,
}

/// Outcome of classifying a user message at the input gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Continue,
    Finish,
}

/// Where a session stands between driver calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingInput,
    Finished,
}

/// Result of a `start` or `resume` call
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: SessionStatus,
    pub state: WorkflowState,
}

impl NodeId {
    pub const ENTRY: NodeId = NodeId::DefineScope;

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::DefineScope => "define_scope",
            NodeId::RefineCode => "refine_code",
            NodeId::AwaitInput => "await_input",
            NodeId::CloseConversation => "close_conversation",
            NodeId::End => "end",
        }
    }

    pub fn transition(self) -> Transition {
        match self {
            NodeId::DefineScope => Transition::Goto(NodeId::RefineCode),
            NodeId::RefineCode => Transition::Goto(NodeId::AwaitInput),
            NodeId::AwaitInput => Transition::Suspend,
            NodeId::CloseConversation => Transition::Goto(NodeId::End),
            NodeId::End => Transition::Halt,
        }
    }

    /// Status a checkpoint parked at this node reports, if it is a resting point
    pub fn status(self) -> Option<SessionStatus> {
        match self {
            NodeId::AwaitInput => Some(SessionStatus::AwaitingInput),
            NodeId::End => Some(SessionStatus::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Route {
    /// Coerce raw classifier output into a route.
    ///
    /// Anything other than an exact label, after trimming, continues the
    /// conversation.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "finish_conversation" | "finish" => Route::Finish,
            "coder_agent" | "continue" => Route::Continue,
            other => {
                log::warn!(
                    "Unrecognised route label {:?}, defaulting to continue",
                    other
                );
                Route::Continue
            }
        }
    }

    pub fn target(self) -> NodeId {
        match self {
            Route::Continue => NodeId::RefineCode,
            Route::Finish => NodeId::CloseConversation,
        }
    }
}
