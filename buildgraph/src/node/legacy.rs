//! Adapter bridging externally-defined legacy build steps into the node
//! contract.
//!
//! The legacy side needs to expose exactly four things: a real build entry
//! point, a simulated one, a way to receive the flattened dependency
//! product list before building, and a way to yield its own products
//! afterward. No other coupling is required of it.

use super::{BuildAction, BuildContext};
use crate::core::{AgentConstraints, BuildProducts, EmailPolicy};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Scheduling and storage metadata published by a legacy step description.
///
/// Copied into the adapter's node exactly once at construction; the node
/// never reads the description again for these values.
#[derive(Debug, Clone, Default)]
pub struct LegacyStepMetadata {
    /// Agent affinity and scheduling hints.
    pub agent: AgentConstraints,
    /// Notification policy.
    pub emails: EmailPolicy,
    /// Display grouping label.
    pub display_group: String,
    /// Game scope for temp storage.
    pub game_scope: String,
    /// Storage root for temp storage.
    pub storage_root: String,
    /// Whether the step persists across graph re-evaluations.
    pub is_sticky: bool,
    /// Whether the step is a test.
    pub is_test: bool,
    /// Declared input-dependency names.
    pub input_dependencies: Vec<String>,
    /// Declared order-dependency names.
    pub order_dependencies: Vec<String>,
}

/// An externally-defined legacy build step.
#[async_trait]
pub trait LegacyStep: Send + Sync + fmt::Debug {
    /// The step's unique name.
    fn name(&self) -> &str;

    /// One-time snapshot of the step's scheduling metadata.
    fn metadata(&self) -> LegacyStepMetadata;

    /// The real build entry point. Receives every input dependency's
    /// products flattened into one list; returns the step's own products.
    async fn build(&self, dependency_products: &BuildProducts)
        -> anyhow::Result<BuildProducts>;

    /// The simulated build entry point, same data flow.
    async fn fake_build(
        &self,
        dependency_products: &BuildProducts,
    ) -> anyhow::Result<BuildProducts>;
}

/// Build action delegating to a wrapped legacy step.
#[derive(Debug, Clone)]
pub struct LegacyAdapter {
    step: Arc<dyn LegacyStep>,
}

impl LegacyAdapter {
    /// Wraps a legacy step.
    #[must_use]
    pub fn new(step: Arc<dyn LegacyStep>) -> Self {
        Self { step }
    }

    /// The wrapped step.
    #[must_use]
    pub fn step(&self) -> &Arc<dyn LegacyStep> {
        &self.step
    }
}

#[async_trait]
impl BuildAction for LegacyAdapter {
    async fn build(&self, ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        self.step.build(ctx.all_dependency_products()).await
    }

    async fn fake_build(&self, ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        self.step.fake_build(ctx.all_dependency_products()).await
    }
}
