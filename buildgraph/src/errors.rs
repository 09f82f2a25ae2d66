//! Error types for the build-graph engine.
//!
//! Construction problems (unresolved names, cycles, duplicate nodes) are
//! fatal before any execution begins. Execution-time failures always carry
//! the originating node's name so pipeline reports can attribute them to a
//! specific step.

use thiserror::Error;

/// The main error type for graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph construction failed.
    #[error("{0}")]
    Validation(#[from] GraphValidationError),

    /// A node was executed while one of its controlling triggers was still
    /// unactivated. This is a scheduling error in the caller, not a build
    /// failure.
    #[error("{0}")]
    TriggerGate(#[from] TriggerGateError),

    /// A node was executed before one of its dependencies completed.
    #[error("{0}")]
    DependencyIncomplete(#[from] DependencyIncompleteError),

    /// The node's build action raised an error.
    #[error("node '{node}' failed: {source}")]
    BuildFailure {
        /// The failing node.
        node: String,
        /// The underlying action error.
        #[source]
        source: anyhow::Error,
    },

    /// Build products could not be archived or retrieved for a node, after
    /// any applicable game-scope fallback.
    #[error("build products unavailable for node '{node}': {source}")]
    Artifact {
        /// The owning node.
        node: String,
        /// The underlying store error.
        #[source]
        source: ArtifactStoreError,
    },

    /// The named node does not exist in the graph.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// A trigger operation was applied to a non-trigger node.
    #[error("node '{0}' is not a trigger")]
    NotATrigger(String),

    /// A trigger was activated before its own build completed.
    #[error("trigger '{0}' cannot be activated before its own build completes")]
    TriggerNotReady(String),

    /// An illegal node state transition was attempted.
    #[error("{0}")]
    State(#[from] crate::core::StateError),

    /// A generic internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic metadata attached to validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// Error code (e.g. "GRAPH-002-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl ValidationErrorInfo {
    /// Creates new validation error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

/// Error raised when graph construction fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GraphValidationError {
    /// The error message.
    pub message: String,
    /// The nodes involved in the error.
    pub nodes: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ValidationErrorInfo>,
}

impl GraphValidationError {
    /// Creates a new graph validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            nodes: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the nodes involved.
    #[must_use]
    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ValidationErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}

/// Error raised when a cycle is detected in the dependency relation.
#[derive(Debug, Clone, Error)]
#[error("cycle detected in build graph: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of nodes forming the cycle.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

impl From<CycleDetectedError> for GraphValidationError {
    fn from(err: CycleDetectedError) -> Self {
        let info = ValidationErrorInfo::new("GRAPH-002-CYCLE", err.to_string())
            .with_fix_hint("Remove one of the dependencies in the cycle to break it.");
        GraphValidationError {
            message: err.to_string(),
            nodes: err.cycle_path,
            error_info: Some(info),
        }
    }
}

/// Error raised when a gated node is executed before its controlling
/// trigger is activated.
#[derive(Debug, Clone, Error)]
#[error("node '{node}' is gated by unactivated trigger '{trigger}'")]
pub struct TriggerGateError {
    /// The gated node.
    pub node: String,
    /// The unactivated trigger.
    pub trigger: String,
}

impl TriggerGateError {
    /// Creates a new trigger gate error.
    #[must_use]
    pub fn new(node: impl Into<String>, trigger: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            trigger: trigger.into(),
        }
    }
}

/// Error raised when a node is executed before a dependency completed.
#[derive(Debug, Clone, Error)]
#[error("node '{node}' cannot run: dependency '{dependency}' has not completed")]
pub struct DependencyIncompleteError {
    /// The node that was asked to run.
    pub node: String,
    /// The incomplete dependency.
    pub dependency: String,
}

impl DependencyIncompleteError {
    /// Creates a new dependency incomplete error.
    #[must_use]
    pub fn new(node: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            dependency: dependency.into(),
        }
    }
}

/// Errors raised by artifact stores.
#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    /// No archived products exist under the requested key.
    #[error("no archived products for block '{block}' (game scope '{game_scope}')")]
    NotFound {
        /// The block name.
        block: String,
        /// The game scope that was searched.
        game_scope: String,
    },

    /// A stored manifest could not be parsed.
    #[error("manifest for block '{block}' is invalid: {source}")]
    Manifest {
        /// The block name.
        block: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// IO error while reading or writing the store.
    #[error("artifact store io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = GraphValidationError::new("node 'A' depends on unknown node 'B'")
            .with_nodes(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(err.to_string(), "node 'A' depends on unknown node 'B'");
        assert_eq!(err.nodes.len(), 2);
    }

    #[test]
    fn test_cycle_error_path() {
        let err = CycleDetectedError::new(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert!(err.to_string().contains("a -> b -> a"));

        let validation: GraphValidationError = err.into();
        assert_eq!(validation.error_info.unwrap().code, "GRAPH-002-CYCLE");
    }

    #[test]
    fn test_trigger_gate_error_names_both_parties() {
        let err = TriggerGateError::new("Package", "ReleaseGate");
        let text = err.to_string();
        assert!(text.contains("Package"));
        assert!(text.contains("ReleaseGate"));
    }

    #[test]
    fn test_build_failure_is_tagged_with_node_name() {
        let err = GraphError::BuildFailure {
            node: "CompileEditor".to_string(),
            source: anyhow::anyhow!("linker exited with status 1"),
        };
        assert!(err.to_string().contains("CompileEditor"));
    }

    #[test]
    fn test_store_not_found_display() {
        let err = ArtifactStoreError::NotFound {
            block: "cl-1234-Compile".to_string(),
            game_scope: "Foo".to_string(),
        };
        assert!(err.to_string().contains("cl-1234-Compile"));
        assert!(err.to_string().contains("Foo"));
    }
}
