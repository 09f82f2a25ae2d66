//! Node readiness state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The readiness of a node within a graph run.
///
/// Readiness is a single explicit state rather than a scatter of boolean
/// flags, so the gating and completion invariants can be checked at every
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Waiting on incomplete dependencies or an unactivated trigger.
    Blocked,
    /// All dependencies complete and all controlling triggers activated.
    Ready,
    /// Currently executing.
    Running,
    /// Finished successfully; `build_products` is populated.
    Complete,
    /// Execution raised an error.
    Failed,
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Blocked
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked => write!(f, "blocked"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Error raised for a transition the state machine does not permit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal node state transition: {from} -> {to}")]
pub struct StateError {
    /// The state the node was in.
    pub from: NodeState,
    /// The state the caller asked for.
    pub to: NodeState,
}

impl NodeState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Returns true if the node finished successfully.
    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }

    /// The single transition function.
    ///
    /// Permitted transitions: `Blocked -> Ready`, `Ready -> Running`,
    /// `Running -> Complete | Failed`, and `Blocked | Ready -> Complete`
    /// (a node found already archived is marked complete without running).
    ///
    /// # Errors
    ///
    /// Returns `StateError` for any other pair.
    pub fn transition(self, to: Self) -> Result<Self, StateError> {
        let permitted = matches!(
            (self, to),
            (Self::Blocked, Self::Ready)
                | (Self::Ready, Self::Running)
                | (Self::Running, Self::Complete | Self::Failed)
                | (Self::Blocked | Self::Ready, Self::Complete)
        );
        if permitted {
            Ok(to)
        } else {
            Err(StateError { from: self, to })
        }
    }
}
