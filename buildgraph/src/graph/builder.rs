//! Graph builder with two-phase name resolution.
//!
//! Declarations are accumulated first, keyed by name; a single resolution
//! pass at [`GraphBuilder::build`] turns every name into a checked
//! reference. Unresolved names, duplicates, and cycles are construction
//! errors; execution never encounters them.

use super::{BuildGraph, NodeSpec, StepDeclaration};
use crate::errors::{CycleDetectedError, GraphValidationError, ValidationErrorInfo};
use crate::node::{AggregateSpec, LegacyStep, Node, TriggerState};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Builder for validated build graphs.
#[derive(Debug)]
pub struct GraphBuilder {
    name: String,
    specs: HashMap<String, NodeSpec>,
    order: Vec<String>,
}

impl GraphBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specs: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of accumulated specifications.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.specs.len()
    }

    /// Adds a node specification.
    ///
    /// Dependencies may reference names that have not been added yet;
    /// they are resolved together at [`GraphBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns an error if the specification is invalid in isolation or the
    /// name is already taken.
    pub fn add(&mut self, spec: NodeSpec) -> Result<(), GraphValidationError> {
        spec.validate()?;

        if self.specs.contains_key(spec.name()) {
            return Err(GraphValidationError::new(format!(
                "duplicate node name '{}'",
                spec.name()
            ))
            .with_nodes(vec![spec.name().to_string()])
            .with_error_info(ValidationErrorInfo::new(
                "GRAPH-003-DUPLICATE",
                "Every node name must be unique within a graph",
            )));
        }

        self.order.push(spec.name().to_string());
        self.specs.insert(spec.name().to_string(), spec);
        Ok(())
    }

    /// Adds a node specification, consuming and returning the builder.
    ///
    /// # Errors
    ///
    /// Same as [`GraphBuilder::add`].
    pub fn with_node(mut self, spec: NodeSpec) -> Result<Self, GraphValidationError> {
        self.add(spec)?;
        Ok(self)
    }

    /// Adds a declared step with a no-op action.
    ///
    /// # Errors
    ///
    /// Same as [`GraphBuilder::add`].
    pub fn add_declaration(
        &mut self,
        declaration: &StepDeclaration,
    ) -> Result<(), GraphValidationError> {
        self.add(declaration.to_spec())
    }

    /// Adds every declared step from an external step list.
    ///
    /// # Errors
    ///
    /// Same as [`GraphBuilder::add`].
    pub fn add_declarations<'a>(
        &mut self,
        declarations: impl IntoIterator<Item = &'a StepDeclaration>,
    ) -> Result<(), GraphValidationError> {
        for declaration in declarations {
            self.add_declaration(declaration)?;
        }
        Ok(())
    }

    /// Adds a legacy build step, snapshotting its metadata.
    ///
    /// # Errors
    ///
    /// Same as [`GraphBuilder::add`].
    pub fn add_legacy_step(&mut self, step: Arc<dyn LegacyStep>) -> Result<(), GraphValidationError> {
        self.add(NodeSpec::from_legacy(step))
    }

    /// Adds an aggregate node.
    ///
    /// # Errors
    ///
    /// Same as [`GraphBuilder::add`].
    pub fn add_aggregate(&mut self, aggregate: &AggregateSpec) -> Result<(), GraphValidationError> {
        self.add(NodeSpec::aggregate(aggregate))
    }

    /// Adds a trigger node.
    ///
    /// # Errors
    ///
    /// Same as [`GraphBuilder::add`].
    pub fn add_trigger(
        &mut self,
        name: impl Into<String>,
        state: TriggerState,
    ) -> Result<(), GraphValidationError> {
        self.add(NodeSpec::trigger(name, state))
    }

    /// Resolves every name reference and wires the graph.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty builder, an unresolved dependency or
    /// trigger name, a non-trigger named as a controlling trigger, a
    /// dependency cycle, or a node with multiple direct controlling
    /// triggers.
    pub fn build(mut self) -> Result<BuildGraph, GraphValidationError> {
        if self.specs.is_empty() {
            return Err(GraphValidationError::new("graph has no nodes").with_error_info(
                ValidationErrorInfo::new("GRAPH-004-EMPTY", "Cannot build an empty graph")
                    .with_fix_hint("Add at least one node before building."),
            ));
        }

        self.check_references()?;
        self.inject_trigger_dependencies();
        self.detect_cycles()?;

        let topological = self.topological_order();
        let trigger_chains = self.derive_trigger_chains(&topological)?;
        let frequency_shifts = self.propagate_frequencies(&topological);

        let mut nodes = HashMap::new();
        for (name, spec) in self.specs {
            let parts = spec.into_parts();
            let mut node = Node::new(
                parts.name,
                parts.kind,
                parts.agent,
                parts.emails,
                parts.display_group,
                parts.game_scope,
                parts.storage_root,
                parts.is_sticky,
                parts.is_test,
                parts.input_dependencies,
                parts.order_dependencies,
                parts.action,
            );
            if let Some(chain) = trigger_chains.get(&name) {
                node.set_controlling_triggers(chain.clone());
            }
            if let Some(&shift) = frequency_shifts.get(&name) {
                node.agent_mut().frequency_shift = shift;
            }
            nodes.insert(name, node);
        }

        tracing::debug!(
            graph = %self.name,
            nodes = nodes.len(),
            "build graph wired and validated"
        );

        let mut graph = BuildGraph::new(self.name, nodes, topological);
        graph
            .refresh_states()
            .map_err(|err| GraphValidationError::new(err.to_string()))?;
        Ok(graph)
    }

    /// Fails on any dependency or trigger name that does not resolve, and
    /// on controlling triggers that name a non-trigger node.
    fn check_references(&self) -> Result<(), GraphValidationError> {
        for name in &self.order {
            let spec = &self.specs[name];
            for dep in spec
                .input_dependencies()
                .iter()
                .chain(spec.order_dependencies())
            {
                if !self.specs.contains_key(dep) {
                    return Err(GraphValidationError::new(format!(
                        "node '{name}' depends on unknown node '{dep}'"
                    ))
                    .with_nodes(vec![name.clone(), dep.clone()])
                    .with_error_info(
                        ValidationErrorInfo::new(
                            "GRAPH-001-UNRESOLVED",
                            format!("Dependency '{dep}' not found"),
                        )
                        .with_fix_hint("Check the declared dependency list for typos."),
                    ));
                }
            }
            for trigger in spec.controlling_triggers() {
                match self.specs.get(trigger) {
                    None => {
                        return Err(GraphValidationError::new(format!(
                            "node '{name}' is gated by unknown trigger '{trigger}'"
                        ))
                        .with_nodes(vec![name.clone(), trigger.clone()])
                        .with_error_info(ValidationErrorInfo::new(
                            "GRAPH-001-UNRESOLVED",
                            format!("Trigger '{trigger}' not found"),
                        )));
                    }
                    Some(target) if !target.kind().is_trigger() => {
                        return Err(GraphValidationError::new(format!(
                            "node '{name}' names non-trigger node '{trigger}' as a controlling trigger"
                        ))
                        .with_nodes(vec![name.clone(), trigger.clone()])
                        .with_error_info(ValidationErrorInfo::new(
                            "GRAPH-005-TRIGGER",
                            "Controlling triggers must be trigger nodes",
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// A node can only be gated by triggers it depends on; make that hold
    /// by construction by adding each declared trigger as an order
    /// dependency.
    fn inject_trigger_dependencies(&mut self) {
        for spec in self.specs.values_mut() {
            let triggers: Vec<String> = spec.controlling_triggers().to_vec();
            for trigger in triggers {
                if !spec.input_dependencies().contains(&trigger) {
                    spec.add_order_dependency(trigger);
                }
            }
        }
    }

    fn dependency_names<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a String> {
        let spec = &self.specs[name];
        spec.input_dependencies()
            .iter()
            .chain(spec.order_dependencies())
    }

    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in &self.order {
            if !visited.contains(name) {
                if let Some(cycle) = self.dfs_cycle(name, &mut visited, &mut rec_stack, &mut path) {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }
        Ok(())
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        for dep in self.dependency_names(node) {
            if !visited.contains(dep) {
                if let Some(cycle) = self.dfs_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(dep) {
                let cycle_start = path.iter().position(|n| n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[cycle_start..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }

    /// Deterministic topological order: dependencies first, ties broken by
    /// insertion order.
    fn topological_order(&self) -> Vec<String> {
        fn visit(
            node: &str,
            builder: &GraphBuilder,
            visited: &mut HashSet<String>,
            result: &mut Vec<String>,
        ) {
            if visited.contains(node) {
                return;
            }
            visited.insert(node.to_string());
            for dep in builder.dependency_names(node) {
                visit(dep, builder, visited, result);
            }
            result.push(node.to_string());
        }

        let mut visited = HashSet::new();
        let mut result = Vec::new();
        for name in &self.order {
            visit(name, self, &mut visited, &mut result);
        }
        result
    }

    /// Finds the controlling-trigger chain for every node.
    ///
    /// The direct controlling trigger is the nearest trigger along any
    /// dependency edge; chains are inherited through it. A trigger chain of
    /// `X.Y` means the node sits behind `Y`, which itself sits behind `X`.
    fn derive_trigger_chains(
        &self,
        topological: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphValidationError> {
        let mut chains: HashMap<String, Vec<String>> = HashMap::new();

        for name in topological {
            let mut direct: Vec<String> = Vec::new();
            for dep in self.dependency_names(name) {
                let candidate = if self.specs[dep].kind().is_trigger() {
                    Some(dep.clone())
                } else {
                    chains[dep].last().cloned()
                };
                if let Some(candidate) = candidate {
                    if !direct.contains(&candidate) {
                        direct.push(candidate);
                    }
                }
            }

            // If a node sits behind a chain X.Y, only the innermost trigger
            // matters; drop candidates that appear in another candidate's
            // own chain.
            let filtered: Vec<String> = direct
                .iter()
                .filter(|candidate| {
                    !direct
                        .iter()
                        .any(|other| chains[other].contains(*candidate))
                })
                .cloned()
                .collect();

            if filtered.len() > 1 {
                return Err(GraphValidationError::new(format!(
                    "node '{name}' has multiple controlling triggers: {}",
                    filtered.join(", ")
                ))
                .with_nodes(vec![name.clone()])
                .with_error_info(ValidationErrorInfo::new(
                    "GRAPH-005-TRIGGER",
                    "A node may sit behind at most one trigger chain",
                )));
            }

            let chain = filtered.first().map_or_else(Vec::new, |trigger| {
                let mut chain = chains[trigger].clone();
                chain.push(trigger.clone());
                chain
            });
            chains.insert(name.clone(), chain);
        }

        Ok(chains)
    }

    /// Raises each node's frequency shift to the maximum of its transitive
    /// dependencies' shifts, so a node never runs more often than what it
    /// consumes.
    fn propagate_frequencies(&self, topological: &[String]) -> HashMap<String, u32> {
        let mut shifts: HashMap<String, u32> = HashMap::new();
        for name in topological {
            let own = self.specs[name].agent().frequency_shift;
            let inherited = self
                .dependency_names(name)
                .map(|dep| shifts[dep])
                .max()
                .unwrap_or(0);
            shifts.insert(name.clone(), own.max(inherited));
        }
        shifts
    }
}
