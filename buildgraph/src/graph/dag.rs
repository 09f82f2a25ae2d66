//! The wired build graph and its execution drivers.
//!
//! The graph exposes a derived partial order: two nodes may run
//! concurrently when neither is in the other's dependency closure and
//! neither is held behind an unactivated trigger. Mapping ready nodes onto
//! agents is the external scheduler's job; the parallel driver here runs
//! every eligible node as soon as its dependencies finish.

use crate::core::{BuildProducts, NodeState};
use crate::errors::{DependencyIncompleteError, GraphError, TriggerGateError};
use crate::node::{BuildContext, Node, RunMode, TriggerState};
use crate::storage::{exists_with_fallback, ArtifactStore};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Result of driving a graph run to quiescence.
#[derive(Debug, Clone)]
pub struct GraphRunResult {
    /// Products of every complete node, keyed by name.
    pub products: HashMap<String, BuildProducts>,
    /// Nodes held behind an unactivated trigger.
    pub gated: Vec<String>,
    /// Nodes left unreached because an upstream node failed.
    pub skipped: Vec<String>,
    /// Total wall-clock time in milliseconds.
    pub duration_ms: f64,
    /// Whether the run finished without a build failure.
    pub success: bool,
    /// Error message if a node failed.
    pub error: Option<String>,
}

/// A validated, fully resolved build graph.
#[derive(Debug)]
pub struct BuildGraph {
    name: String,
    nodes: HashMap<String, Node>,
    order: Vec<String>,
    store_prefix: String,
}

impl BuildGraph {
    pub(crate) fn new(name: String, nodes: HashMap<String, Node>, order: Vec<String>) -> Self {
        Self {
            name,
            nodes,
            order,
            store_prefix: String::new(),
        }
    }

    /// The graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Topological execution order: dependencies first.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    /// Looks up a node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Iterates over the nodes in execution order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Sets the prefix under which this graph's nodes are archived,
    /// typically an identifier of the change being built.
    pub fn set_store_prefix(&mut self, prefix: impl Into<String>) {
        self.store_prefix = prefix.into();
    }

    /// The storage block prefix.
    #[must_use]
    pub fn store_prefix(&self) -> &str {
        &self.store_prefix
    }

    fn node_ref(&self, name: &str) -> Result<&Node, GraphError> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    fn trigger_activated(&self, name: &str) -> bool {
        self.nodes
            .get(name)
            .and_then(Node::as_trigger)
            .is_some_and(TriggerState::is_triggered)
    }

    /// True when every dependency is complete and every controlling trigger
    /// is activated.
    fn is_eligible(&self, node: &Node) -> bool {
        let deps_complete = node
            .input_dependencies()
            .iter()
            .chain(node.order_dependencies())
            .all(|dep| self.nodes.get(dep).is_some_and(Node::is_complete));
        deps_complete
            && node
                .controlling_triggers()
                .iter()
                .all(|trigger| self.trigger_activated(trigger))
    }

    /// The nodes currently eligible to run, in execution order.
    ///
    /// A node appears here when it is not yet running or finished, all its
    /// dependencies are complete, and every controlling trigger is
    /// activated.
    #[must_use]
    pub fn ready_nodes(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|name| self.nodes.get(name))
            .filter(|node| {
                node.state() != NodeState::Running
                    && !node.state().is_terminal()
                    && self.is_eligible(node)
            })
            .map(Node::name)
            .collect()
    }

    /// Promotes blocked nodes that have become eligible.
    pub(crate) fn refresh_states(&mut self) -> Result<(), GraphError> {
        let newly_ready: Vec<String> = self
            .nodes
            .values()
            .filter(|node| node.state() == NodeState::Blocked && self.is_eligible(node))
            .map(|node| node.name().to_string())
            .collect();
        for name in newly_ready {
            self.node_mut(&name)?.set_state(NodeState::Ready)?;
        }
        Ok(())
    }

    /// Activates a trigger, unblocking the nodes it gates.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for an unknown name, `NotATrigger` for a
    /// non-trigger node, and `TriggerNotReady` when the trigger node's own
    /// build has not completed yet.
    pub fn activate_trigger(&mut self, name: &str) -> Result<(), GraphError> {
        {
            let node = self.node_ref(name)?;
            if node.as_trigger().is_none() {
                return Err(GraphError::NotATrigger(name.to_string()));
            }
            if !node.is_complete() {
                return Err(GraphError::TriggerNotReady(name.to_string()));
            }
        }
        if let Some(trigger) = self.node_mut(name)?.as_trigger_mut() {
            trigger.activate();
        }
        tracing::info!(trigger = name, "trigger activated");
        self.refresh_states()
    }

    /// Rejects execution while a controlling trigger is unactivated or a
    /// dependency is incomplete.
    fn check_preconditions(&self, name: &str) -> Result<(), GraphError> {
        let node = self.node_ref(name)?;
        for trigger in node.controlling_triggers() {
            if !self.trigger_activated(trigger) {
                return Err(TriggerGateError::new(name, trigger).into());
            }
        }
        for dep in node
            .input_dependencies()
            .iter()
            .chain(node.order_dependencies())
        {
            if !self.node_ref(dep)?.is_complete() {
                return Err(DependencyIncompleteError::new(name, dep).into());
            }
        }
        Ok(())
    }

    fn build_context(&self, node: &Node, mode: RunMode) -> BuildContext {
        let dependency_products = node
            .input_dependencies()
            .iter()
            .map(|dep| {
                let products = self
                    .nodes
                    .get(dep)
                    .map(|n| n.build_products().clone())
                    .unwrap_or_default();
                (dep.clone(), products)
            })
            .collect();
        BuildContext::new(node.name(), mode, dependency_products)
    }

    fn flattened_dependency_products(&self, name: &str) -> Result<BuildProducts, GraphError> {
        let node = self.node_ref(name)?;
        let mut products = BuildProducts::new();
        for dep in node.input_dependencies() {
            products.extend_from(self.node_ref(dep)?.build_products());
        }
        Ok(products)
    }

    /// Retrieves products for a node that completed in an earlier run but
    /// has none in memory yet.
    fn hydrate_node_products(
        &mut self,
        name: &str,
        store: &dyn ArtifactStore,
    ) -> Result<(), GraphError> {
        let needs_hydration = {
            let node = self.node_ref(name)?;
            node.is_complete() && node.build_products().is_empty() && !node.kind().is_aggregate()
        };
        if needs_hydration {
            let prefix = self.store_prefix.clone();
            let retrieved = self.node_mut(name)?.retrieve_build_products(store, &prefix)?;
            tracing::info!(
                node = name,
                was_local = retrieved.was_local,
                used_fallback = retrieved.used_fallback,
                "retrieved build products"
            );
        }
        Ok(())
    }

    /// Applies a finished action's outcome to the node.
    fn apply_result(
        &mut self,
        name: &str,
        result: anyhow::Result<BuildProducts>,
        store: Option<&dyn ArtifactStore>,
    ) -> Result<(), GraphError> {
        match result {
            Ok(mut products) => {
                let upstream = self.flattened_dependency_products(name)?;
                products.remove_overlapping(&upstream);

                let is_aggregate = self.node_ref(name)?.kind().is_aggregate();
                if products.is_empty() && !is_aggregate {
                    // A successful build with nothing to show still leaves a
                    // record of success for dependents and the store.
                    products.add(format!("{name}_Success.log"));
                }

                {
                    let node = self.node_mut(name)?;
                    node.set_build_products(products);
                    node.set_state(NodeState::Complete)?;
                }
                tracing::info!(node = name, "node complete");

                if !is_aggregate {
                    if let Some(store) = store {
                        let prefix = self.store_prefix.clone();
                        self.node_ref(name)?
                            .archive_build_products(store, &prefix, false)?;
                    }
                }
                self.refresh_states()
            }
            Err(source) => {
                self.node_mut(name)?.set_state(NodeState::Failed)?;
                tracing::error!(node = name, error = %source, "node failed");
                Err(GraphError::BuildFailure {
                    node: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Executes a single node.
    ///
    /// Preconditions are enforced, not assumed: running a gated node is a
    /// `TriggerGate` error and running ahead of an incomplete dependency is
    /// a `DependencyIncomplete` error. Running an already complete node is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns a precondition error as above, `BuildFailure` tagged with
    /// the node's name if its action fails, or an artifact error if
    /// store interaction fails.
    pub async fn run_node(
        &mut self,
        name: &str,
        store: Option<&dyn ArtifactStore>,
        mode: RunMode,
    ) -> Result<(), GraphError> {
        if self.node_ref(name)?.is_complete() {
            return Ok(());
        }
        self.check_preconditions(name)?;

        if let Some(store) = store {
            let deps: Vec<String> = self.node_ref(name)?.input_dependencies().to_vec();
            for dep in deps {
                self.hydrate_node_products(&dep, store)?;
            }
        }

        let (ctx, action) = {
            let node = self.node_ref(name)?;
            (self.build_context(node, mode), node.action_handle())
        };
        {
            let node = self.node_mut(name)?;
            if node.state() == NodeState::Blocked {
                node.set_state(NodeState::Ready)?;
            }
            node.set_state(NodeState::Running)?;
        }

        tracing::info!(node = name, mode = %mode, "running node");
        let result = match mode {
            RunMode::Real => action.build(&ctx).await,
            RunMode::Fake => action.fake_build(&ctx).await,
        };
        self.apply_result(name, result, store)
    }

    /// Marks nodes whose products are already archived as complete, so a
    /// resumed pipeline does not rebuild them. Probing honors the same
    /// empty-game-scope fallback as retrieval.
    ///
    /// # Errors
    ///
    /// Returns an error only for an illegal internal state transition.
    pub fn find_completion_state(
        &mut self,
        store: &dyn ArtifactStore,
        local_only: bool,
    ) -> Result<(), GraphError> {
        let prefix = self.store_prefix.clone();
        for name in self.order.clone() {
            let (block, game_scope, storage_root) = {
                let node = self.node_ref(&name)?;
                if node.is_complete() || node.kind().is_aggregate() {
                    continue;
                }
                (
                    node.storage_block(&prefix),
                    node.game_scope().to_string(),
                    node.storage_root().to_string(),
                )
            };
            if exists_with_fallback(store, &block, &game_scope, &storage_root, local_only) {
                self.node_mut(&name)?.set_state(NodeState::Complete)?;
                tracing::debug!(node = %name, "node already archived, marked complete");
            }
        }
        self.refresh_states()
    }

    /// Drives the graph until nothing more can run.
    ///
    /// Every eligible node is scheduled as soon as its dependencies finish;
    /// independent nodes run concurrently. Nodes behind an unactivated
    /// trigger are held without failing the run. The first build failure
    /// stops new scheduling, drains what is in flight, and is reported in
    /// the result; already archived sibling products are untouched.
    ///
    /// When a store is supplied, nodes completed in earlier runs are
    /// retrieved rather than rebuilt, and every newly built node's products
    /// are archived as it finishes.
    ///
    /// # Errors
    ///
    /// Returns an error for store or internal failures; a node's build
    /// failure is reported in the result, not as an `Err`.
    pub async fn execute(
        &mut self,
        store: Option<&dyn ArtifactStore>,
        mode: RunMode,
    ) -> Result<GraphRunResult, GraphError> {
        let start = Instant::now();

        if let Some(store) = store {
            for name in self.order.clone() {
                self.hydrate_node_products(&name, store)?;
            }
        }
        self.refresh_states()?;

        let mut scheduled: HashSet<String> = HashSet::new();
        let mut failure: Option<String> = None;
        let mut active: FuturesUnordered<
            tokio::task::JoinHandle<(String, anyhow::Result<BuildProducts>)>,
        > = FuturesUnordered::new();

        loop {
            if failure.is_none() {
                let ready: Vec<String> = self
                    .ready_nodes()
                    .into_iter()
                    .map(str::to_string)
                    .filter(|name| !scheduled.contains(name))
                    .collect();
                for name in ready {
                    scheduled.insert(name.clone());
                    let (ctx, action) = {
                        let node = self.node_ref(&name)?;
                        (self.build_context(node, mode), node.action_handle())
                    };
                    {
                        let node = self.node_mut(&name)?;
                        if node.state() == NodeState::Blocked {
                            node.set_state(NodeState::Ready)?;
                        }
                        node.set_state(NodeState::Running)?;
                    }
                    tracing::info!(node = %name, mode = %mode, "running node");
                    active.push(tokio::spawn(async move {
                        let result = match mode {
                            RunMode::Real => action.build(&ctx).await,
                            RunMode::Fake => action.fake_build(&ctx).await,
                        };
                        (name, result)
                    }));
                }
            }

            let Some(joined) = active.next().await else {
                break;
            };
            let (name, result) =
                joined.map_err(|err| GraphError::Internal(format!("task join error: {err}")))?;

            match self.apply_result(&name, result, store) {
                Ok(()) => {}
                Err(GraphError::BuildFailure { node, source }) => {
                    failure = Some(format!("node '{node}' failed: {source}"));
                }
                Err(other) => return Err(other),
            }
        }

        let mut products = HashMap::new();
        let mut gated = Vec::new();
        let mut skipped = Vec::new();
        for name in &self.order {
            let node = self.node_ref(name)?;
            match node.state() {
                NodeState::Complete => {
                    products.insert(name.clone(), node.build_products().clone());
                }
                NodeState::Failed => {}
                _ => {
                    if node
                        .controlling_triggers()
                        .iter()
                        .any(|trigger| !self.trigger_activated(trigger))
                    {
                        gated.push(name.clone());
                    } else {
                        skipped.push(name.clone());
                    }
                }
            }
        }

        if failure.is_none() && !skipped.is_empty() {
            return Err(GraphError::Internal(format!(
                "deadlocked graph; unreached nodes: {skipped:?}"
            )));
        }

        Ok(GraphRunResult {
            products,
            gated,
            skipped,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            success: failure.is_none(),
            error: failure,
        })
    }
}
