//! Graph construction and execution.
//!
//! This module provides:
//! - Declarative step descriptions and name-list parsing
//! - Node specifications with validation
//! - A builder performing single-pass name resolution
//! - The wired graph with single-node and parallel drivers

mod builder;
mod dag;
mod decl;
mod integration_tests;
mod spec;

pub use builder::GraphBuilder;
pub use dag::{BuildGraph, GraphRunResult};
pub use decl::{split_name_list, StepDeclaration};
pub use spec::NodeSpec;
