//! Node specifications accumulated by the graph builder.

use crate::core::{AgentConstraints, EmailPolicy};
use crate::errors::{GraphValidationError, ValidationErrorInfo};
use crate::node::{
    AggregateSpec, BuildAction, LegacyAdapter, LegacyStep, NoOpAction, NodeKind, TriggerState,
};
use crate::utils::validate_node_name;
use std::sync::Arc;

fn push_unique(list: &mut Vec<String>, name: String) {
    if !list.contains(&name) {
        list.push(name);
    }
}

/// Specification for a single node, prior to name resolution.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    name: String,
    kind: NodeKind,
    action: Arc<dyn BuildAction>,
    input_dependencies: Vec<String>,
    order_dependencies: Vec<String>,
    controlling_triggers: Vec<String>,
    agent: AgentConstraints,
    emails: EmailPolicy,
    display_group: String,
    game_scope: String,
    storage_root: String,
    is_sticky: bool,
    is_test: bool,
}

impl NodeSpec {
    /// Creates a plain node specification.
    #[must_use]
    pub fn new(name: impl Into<String>, action: Arc<dyn BuildAction>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Plain,
            action,
            input_dependencies: Vec::new(),
            order_dependencies: Vec::new(),
            controlling_triggers: Vec::new(),
            agent: AgentConstraints::default(),
            emails: EmailPolicy::default(),
            display_group: String::new(),
            game_scope: String::new(),
            storage_root: String::new(),
            is_sticky: false,
            is_test: false,
        }
    }

    /// Creates a trigger node specification.
    #[must_use]
    pub fn trigger(name: impl Into<String>, state: TriggerState) -> Self {
        let mut spec = Self::new(name, Arc::new(NoOpAction::new()));
        spec.kind = NodeKind::Trigger(state);
        spec
    }

    /// Creates an aggregate node specification from an aggregate rollup.
    #[must_use]
    pub fn aggregate(aggregate: &AggregateSpec) -> Self {
        let mut spec = Self::new(aggregate.name(), Arc::new(NoOpAction::new()));
        spec.kind = NodeKind::Aggregate(aggregate.info());
        for dep in aggregate.dependency_names() {
            push_unique(&mut spec.input_dependencies, dep.clone());
        }
        spec
    }

    /// Creates a node specification wrapping a legacy build step,
    /// snapshotting its scheduling metadata once.
    #[must_use]
    pub fn from_legacy(step: Arc<dyn LegacyStep>) -> Self {
        let metadata = step.metadata();
        let name = step.name().to_string();
        let mut spec = Self::new(name, Arc::new(LegacyAdapter::new(step)));
        spec.kind = NodeKind::Legacy;
        spec.agent = metadata.agent;
        spec.emails = metadata.emails;
        spec.display_group = metadata.display_group;
        spec.game_scope = metadata.game_scope;
        spec.storage_root = metadata.storage_root;
        spec.is_sticky = metadata.is_sticky;
        spec.is_test = metadata.is_test;
        for dep in metadata.input_dependencies {
            push_unique(&mut spec.input_dependencies, dep);
        }
        for dep in metadata.order_dependencies {
            push_unique(&mut spec.order_dependencies, dep);
        }
        spec
    }

    /// Adds an input dependency by name.
    #[must_use]
    pub fn with_input_dependency(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.input_dependencies, name.into());
        self
    }

    /// Adds an order dependency by name.
    #[must_use]
    pub fn with_order_dependency(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.order_dependencies, name.into());
        self
    }

    /// Adds a controlling trigger by name.
    #[must_use]
    pub fn with_controlling_trigger(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.controlling_triggers, name.into());
        self
    }

    /// Sets the agent constraints.
    #[must_use]
    pub fn with_agent(mut self, agent: AgentConstraints) -> Self {
        self.agent = agent;
        self
    }

    /// Sets the email policy.
    #[must_use]
    pub fn with_emails(mut self, emails: EmailPolicy) -> Self {
        self.emails = emails;
        self
    }

    /// Sets the display group.
    #[must_use]
    pub fn with_display_group(mut self, group: impl Into<String>) -> Self {
        self.display_group = group.into();
        self
    }

    /// Sets the game scope for temp storage.
    #[must_use]
    pub fn with_game_scope(mut self, scope: impl Into<String>) -> Self {
        self.game_scope = scope.into();
        self
    }

    /// Sets the storage root for temp storage.
    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<String>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Marks the node as persisting across graph re-evaluations.
    #[must_use]
    pub fn sticky(mut self) -> Self {
        self.is_sticky = true;
        self
    }

    /// Marks the node as a test step.
    #[must_use]
    pub fn test(mut self) -> Self {
        self.is_test = true;
        self
    }

    /// The node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind tag.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The declared input dependencies.
    #[must_use]
    pub fn input_dependencies(&self) -> &[String] {
        &self.input_dependencies
    }

    /// The declared order dependencies.
    #[must_use]
    pub fn order_dependencies(&self) -> &[String] {
        &self.order_dependencies
    }

    /// The declared controlling triggers.
    #[must_use]
    pub fn controlling_triggers(&self) -> &[String] {
        &self.controlling_triggers
    }

    /// The agent constraints.
    #[must_use]
    pub fn agent(&self) -> &AgentConstraints {
        &self.agent
    }

    /// The email policy.
    #[must_use]
    pub fn emails(&self) -> &EmailPolicy {
        &self.emails
    }

    /// The game scope.
    #[must_use]
    pub fn game_scope(&self) -> &str {
        &self.game_scope
    }

    /// Validates the specification in isolation.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed name, a self-dependency, or a node
    /// that both shares an agent and is sticky.
    pub fn validate(&self) -> Result<(), GraphValidationError> {
        if let Err(err) = validate_node_name(&self.name) {
            return Err(GraphValidationError::new(err.to_string())
                .with_nodes(vec![self.name.clone()])
                .with_error_info(ValidationErrorInfo::new(
                    "GRAPH-006-NAME",
                    "Node names must be non-empty and free of delimiter characters",
                )));
        }

        let self_referential = self.input_dependencies.contains(&self.name)
            || self.order_dependencies.contains(&self.name)
            || self.controlling_triggers.contains(&self.name);
        if self_referential {
            return Err(GraphValidationError::new(format!(
                "node '{}' cannot depend on itself",
                self.name
            ))
            .with_nodes(vec![self.name.clone()]));
        }

        if self.is_sticky && !self.agent.sharing_group.is_empty() {
            return Err(GraphValidationError::new(format!(
                "node '{}' is both agent sharing and sticky",
                self.name
            ))
            .with_nodes(vec![self.name.clone()])
            .with_error_info(
                ValidationErrorInfo::new(
                    "GRAPH-007-AGENT",
                    "Sticky nodes cannot join an agent sharing group",
                )
                .with_fix_hint("Clear the sharing group or drop the sticky flag."),
            ));
        }

        Ok(())
    }

    pub(crate) fn action_handle(&self) -> Arc<dyn BuildAction> {
        Arc::clone(&self.action)
    }

    pub(crate) fn into_parts(self) -> NodeSpecParts {
        NodeSpecParts {
            name: self.name,
            kind: self.kind,
            action: self.action,
            input_dependencies: self.input_dependencies,
            order_dependencies: self.order_dependencies,
            controlling_triggers: self.controlling_triggers,
            agent: self.agent,
            emails: self.emails,
            display_group: self.display_group,
            game_scope: self.game_scope,
            storage_root: self.storage_root,
            is_sticky: self.is_sticky,
            is_test: self.is_test,
        }
    }

    pub(crate) fn add_order_dependency(&mut self, name: String) {
        push_unique(&mut self.order_dependencies, name);
    }
}

/// Deconstructed spec fields, consumed when wiring the graph.
pub(crate) struct NodeSpecParts {
    pub name: String,
    pub kind: NodeKind,
    pub action: Arc<dyn BuildAction>,
    pub input_dependencies: Vec<String>,
    pub order_dependencies: Vec<String>,
    pub controlling_triggers: Vec<String>,
    pub agent: AgentConstraints,
    pub emails: EmailPolicy,
    pub display_group: String,
    pub game_scope: String,
    pub storage_root: String,
    pub is_sticky: bool,
    pub is_test: bool,
}
