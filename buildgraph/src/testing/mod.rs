//! Reusable fixtures for graph tests.

mod fixtures;

pub use fixtures::{ExecutionLog, FailingAction, ProductsAction, RecordingAction};
