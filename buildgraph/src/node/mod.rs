//! Nodes: the units of work in a build graph.
//!
//! A node is a single record carrying a kind tag and a kind-specific
//! payload; behavior is supplied through the [`BuildAction`] strategy
//! rather than subclassing, so new kinds can be added without reopening
//! the base type.

mod aggregate;
mod legacy;
mod trigger;

pub use aggregate::{AggregateInfo, AggregateSpec};
pub use legacy::{LegacyAdapter, LegacyStep, LegacyStepMetadata};
pub use trigger::TriggerState;

use crate::core::{AgentConstraints, BuildProducts, EmailPolicy, NodeState};
use crate::errors::GraphError;
use crate::storage::{retrieve_with_fallback, ArtifactStore, Retrieved};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Whether a run performs real work or simulates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Execute the real build action.
    Real,
    /// Simulate success without performing the real action, for dry-run
    /// graph evaluation.
    Fake,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Fake => write!(f, "fake"),
        }
    }
}

/// The kind tag of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An ordinary build step.
    Plain,
    /// A build-action-free dependency rollup.
    Aggregate(AggregateInfo),
    /// A manual gate blocking downstream nodes until activated.
    Trigger(TriggerState),
    /// A wrapped externally-defined legacy build step.
    Legacy,
}

impl NodeKind {
    /// Returns true for aggregate nodes.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }

    /// Returns true for trigger nodes.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger(_))
    }
}

/// Context handed to a build action.
///
/// Everything an action needs arrives here explicitly; actions have no
/// ambient access to the graph or to any global owner.
#[derive(Debug, Clone)]
pub struct BuildContext {
    node_name: String,
    mode: RunMode,
    dependency_products: Vec<(String, BuildProducts)>,
    all_products: BuildProducts,
}

impl BuildContext {
    /// Creates a context from the products of the node's input
    /// dependencies, in declaration order.
    #[must_use]
    pub fn new(
        node_name: impl Into<String>,
        mode: RunMode,
        dependency_products: Vec<(String, BuildProducts)>,
    ) -> Self {
        let mut all_products = BuildProducts::new();
        for (_, products) in &dependency_products {
            all_products.extend_from(products);
        }
        Self {
            node_name: node_name.into(),
            mode,
            dependency_products,
            all_products,
        }
    }

    /// The name of the node being built.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// The run mode.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Products of a single input dependency.
    #[must_use]
    pub fn products_of(&self, dependency: &str) -> Option<&BuildProducts> {
        self.dependency_products
            .iter()
            .find(|(name, _)| name == dependency)
            .map(|(_, products)| products)
    }

    /// Every input dependency's products flattened into one ordered,
    /// deduplicated list.
    #[must_use]
    pub fn all_dependency_products(&self) -> &BuildProducts {
        &self.all_products
    }
}

/// The work a node performs.
///
/// Actions are blocking from the graph's point of view: they return only on
/// success or failure, never partially. Returned products may be empty; the
/// graph pads an empty successful result with a record-of-success entry.
#[async_trait]
pub trait BuildAction: Send + Sync + fmt::Debug {
    /// Executes the real build.
    async fn build(&self, ctx: &BuildContext) -> anyhow::Result<BuildProducts>;

    /// Simulates the build without performing real work.
    async fn fake_build(&self, ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        let _ = ctx;
        Ok(BuildProducts::new())
    }
}

/// An action that does nothing and produces nothing.
///
/// Used by triggers, aggregates, and declaration-only steps; the graph's
/// record-of-success padding gives such nodes their product entry.
#[derive(Debug, Clone, Default)]
pub struct NoOpAction;

impl NoOpAction {
    /// Creates a new no-op action.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BuildAction for NoOpAction {
    async fn build(&self, _ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        Ok(BuildProducts::new())
    }
}

/// A fully resolved node in a build graph.
#[derive(Debug)]
pub struct Node {
    name: String,
    kind: NodeKind,
    agent: AgentConstraints,
    emails: EmailPolicy,
    display_group: String,
    game_scope: String,
    storage_root: String,
    sticky: bool,
    is_test: bool,
    input_dependencies: Vec<String>,
    order_dependencies: Vec<String>,
    controlling_triggers: Vec<String>,
    state: NodeState,
    build_products: BuildProducts,
    action: Arc<dyn BuildAction>,
}

#[allow(clippy::too_many_arguments)]
impl Node {
    #[must_use]
    pub(crate) fn new(
        name: String,
        kind: NodeKind,
        agent: AgentConstraints,
        emails: EmailPolicy,
        display_group: String,
        game_scope: String,
        storage_root: String,
        sticky: bool,
        is_test: bool,
        input_dependencies: Vec<String>,
        order_dependencies: Vec<String>,
        action: Arc<dyn BuildAction>,
    ) -> Self {
        Self {
            name,
            kind,
            agent,
            emails,
            display_group,
            game_scope,
            storage_root,
            sticky,
            is_test,
            input_dependencies,
            order_dependencies,
            controlling_triggers: Vec::new(),
            state: NodeState::Blocked,
            build_products: BuildProducts::new(),
            action,
        }
    }

    /// The node's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind tag.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Scheduling constraints for the external scheduler.
    #[must_use]
    pub fn agent(&self) -> &AgentConstraints {
        &self.agent
    }

    /// Notification policy.
    #[must_use]
    pub fn emails(&self) -> &EmailPolicy {
        &self.emails
    }

    /// Display grouping label; defaults to the node name.
    #[must_use]
    pub fn display_group(&self) -> &str {
        if self.display_group.is_empty() {
            &self.name
        } else {
            &self.display_group
        }
    }

    /// Game scope used when archiving this node's products.
    #[must_use]
    pub fn game_scope(&self) -> &str {
        &self.game_scope
    }

    /// Storage root used when archiving this node's products.
    #[must_use]
    pub fn storage_root(&self) -> &str {
        &self.storage_root
    }

    /// Whether the node persists across graph re-evaluations.
    ///
    /// For trigger nodes this is derived: an activated trigger stays sticky
    /// for the remainder of the graph's lifetime.
    #[must_use]
    pub fn is_sticky(&self) -> bool {
        match &self.kind {
            NodeKind::Trigger(state) => state.is_triggered(),
            _ => self.sticky,
        }
    }

    /// Whether the node is a test step.
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.is_test
    }

    /// Input dependencies: completion required, products consumed.
    #[must_use]
    pub fn input_dependencies(&self) -> &[String] {
        &self.input_dependencies
    }

    /// Order dependencies: completion required, products not consumed.
    #[must_use]
    pub fn order_dependencies(&self) -> &[String] {
        &self.order_dependencies
    }

    /// Returns true exactly when `other` is one of this node's order
    /// dependencies.
    #[must_use]
    pub fn depends_on(&self, other: &str) -> bool {
        self.order_dependencies.iter().any(|d| d == other)
    }

    /// The controlling-trigger chain, outermost trigger first.
    #[must_use]
    pub fn controlling_triggers(&self) -> &[String] {
        &self.controlling_triggers
    }

    /// Dot-joined controlling-trigger chain, for display and audit.
    #[must_use]
    pub fn controlling_trigger_path(&self) -> String {
        self.controlling_triggers.join(".")
    }

    /// Current readiness state.
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Returns true once the node has finished successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Products produced by this node, populated after execution.
    #[must_use]
    pub fn build_products(&self) -> &BuildProducts {
        &self.build_products
    }

    /// The trigger payload, if this node is a trigger.
    #[must_use]
    pub fn as_trigger(&self) -> Option<&TriggerState> {
        match &self.kind {
            NodeKind::Trigger(state) => Some(state),
            _ => None,
        }
    }

    /// The aggregate payload, if this node is an aggregate.
    #[must_use]
    pub fn aggregate_info(&self) -> Option<&AggregateInfo> {
        match &self.kind {
            NodeKind::Aggregate(info) => Some(info),
            _ => None,
        }
    }

    /// The storage block name for this node under `prefix`.
    ///
    /// An empty prefix addresses the node by name alone.
    #[must_use]
    pub fn storage_block(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{prefix}-{}", self.name)
        }
    }

    /// Archives this node's products under its own key. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::Artifact` tagged with this node's name if the
    /// store cannot be written.
    pub fn archive_build_products(
        &self,
        store: &dyn ArtifactStore,
        block_prefix: &str,
        local_only: bool,
    ) -> Result<(), GraphError> {
        let block = self.storage_block(block_prefix);
        store
            .archive(
                &block,
                &self.build_products,
                local_only,
                &self.game_scope,
                &self.storage_root,
            )
            .map_err(|source| GraphError::Artifact {
                node: self.name.clone(),
                source,
            })
    }

    /// Populates this node's products from the artifact store, falling back
    /// to the project-agnostic location when the game-scoped retrieval
    /// fails. The returned [`Retrieved`] reports where the products came
    /// from and whether the fallback was used.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::Artifact` tagged with this node's name if both
    /// attempts fail.
    pub fn retrieve_build_products(
        &mut self,
        store: &dyn ArtifactStore,
        block_prefix: &str,
    ) -> Result<Retrieved, GraphError> {
        let block = self.storage_block(block_prefix);
        let retrieved = retrieve_with_fallback(
            store,
            &self.name,
            &block,
            &self.game_scope,
            &self.storage_root,
        )?;
        self.build_products = retrieved.products.clone();
        Ok(retrieved)
    }

    pub(crate) fn action_handle(&self) -> Arc<dyn BuildAction> {
        Arc::clone(&self.action)
    }

    pub(crate) fn set_controlling_triggers(&mut self, triggers: Vec<String>) {
        self.controlling_triggers = triggers;
    }

    pub(crate) fn agent_mut(&mut self) -> &mut AgentConstraints {
        &mut self.agent
    }

    pub(crate) fn set_state(&mut self, state: NodeState) -> Result<(), GraphError> {
        self.state = self.state.transition(state)?;
        Ok(())
    }

    pub(crate) fn set_build_products(&mut self, products: BuildProducts) {
        self.build_products = products;
    }

    pub(crate) fn as_trigger_mut(&mut self) -> Option<&mut TriggerState> {
        match &mut self.kind {
            NodeKind::Trigger(state) => Some(state),
            _ => None,
        }
    }
}
