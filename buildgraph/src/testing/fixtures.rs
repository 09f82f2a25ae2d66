//! Build actions with canned behavior, for exercising graphs in tests.

use crate::core::BuildProducts;
use crate::node::{BuildAction, BuildContext};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// A shared record of which nodes ran, in completion order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a node name.
    pub fn record(&self, name: impl Into<String>) {
        self.entries.lock().push(name.into());
    }

    /// The recorded names, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// How many nodes were recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Position of a name in the log.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().iter().position(|entry| entry == name)
    }
}

/// An action that returns a fixed product list.
#[derive(Debug, Clone)]
pub struct ProductsAction {
    products: BuildProducts,
}

impl ProductsAction {
    /// Creates an action producing the given products.
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            products: products.into_iter().collect(),
        }
    }
}

#[async_trait]
impl BuildAction for ProductsAction {
    async fn build(&self, _ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        Ok(self.products.clone())
    }
}

/// An action that records its node name into an [`ExecutionLog`] when the
/// real build runs.
#[derive(Debug, Clone)]
pub struct RecordingAction {
    log: ExecutionLog,
}

impl RecordingAction {
    /// Creates an action recording into `log`.
    #[must_use]
    pub fn new(log: ExecutionLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl BuildAction for RecordingAction {
    async fn build(&self, ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        self.log.record(ctx.node_name());
        Ok(BuildProducts::new())
    }
}

/// An action that always fails with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingAction {
    message: String,
}

impl FailingAction {
    /// Creates an action failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl BuildAction for FailingAction {
    async fn build(&self, _ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        Err(anyhow::anyhow!(self.message.clone()))
    }

    async fn fake_build(&self, _ctx: &BuildContext) -> anyhow::Result<BuildProducts> {
        Err(anyhow::anyhow!(self.message.clone()))
    }
}
