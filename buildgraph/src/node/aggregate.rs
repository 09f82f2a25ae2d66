//! Aggregate nodes: named, build-action-free dependency rollups.

use crate::graph::StepDeclaration;

/// Policy projections carried by an aggregate node.
///
/// Read-only after construction; consumed by an external promotion-policy
/// evaluator to decide whether the aggregate marks a valid release
/// boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateInfo {
    /// Whether this aggregate may stand in for a release-promotion gate.
    pub is_promotable_aggregate: bool,
    /// Whether the aggregate is promoted separately from the shared
    /// promotion.
    pub is_separate_promotable: bool,
}

/// Specification of an aggregate node.
///
/// The dependency-name list is computed once at construction and never
/// mutated afterward; resolution to checked references happens at graph
/// build time, shared with every other node.
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    name: String,
    dependency_names: Vec<String>,
    info: AggregateInfo,
}

impl AggregateSpec {
    /// Creates an aggregate that depends on the named member nodes
    /// directly, so others can depend on the whole set by a single name.
    #[must_use]
    pub fn of_members(
        name: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut dependency_names = Vec::new();
        for member in members {
            let member = member.into();
            if !dependency_names.contains(&member) {
                dependency_names.push(member);
            }
        }
        Self {
            name: name.into(),
            dependency_names,
            info: AggregateInfo::default(),
        }
    }

    /// Creates an aggregate whose dependency-name list is rolled up from
    /// the wrapped declarations: the union of their own declared dependency
    /// names, as declared, not transitively expanded.
    #[must_use]
    pub fn roll_up(name: impl Into<String>, wrapped: &[&StepDeclaration]) -> Self {
        let mut dependency_names = Vec::new();
        for declaration in wrapped {
            for dep in declaration.declared_dependency_names() {
                if !dependency_names.contains(&dep) {
                    dependency_names.push(dep);
                }
            }
        }
        Self {
            name: name.into(),
            dependency_names,
            info: AggregateInfo::default(),
        }
    }

    /// Marks the aggregate as promotable.
    #[must_use]
    pub fn promotable(mut self) -> Self {
        self.info.is_promotable_aggregate = true;
        self
    }

    /// Marks the aggregate as promoted separately from the shared
    /// promotion. Implies promotable.
    #[must_use]
    pub fn separate_promotable(mut self) -> Self {
        self.info.is_promotable_aggregate = true;
        self.info.is_separate_promotable = true;
        self
    }

    /// The aggregate's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The computed dependency-name list.
    #[must_use]
    pub fn dependency_names(&self) -> &[String] {
        &self.dependency_names
    }

    /// The policy projections.
    #[must_use]
    pub fn info(&self) -> AggregateInfo {
        self.info
    }
}
