//! Core value types shared across the graph engine.

mod agent;
mod notify;
mod products;
mod state;

pub use agent::AgentConstraints;
pub use notify::{merge_recipient_lists, EmailPolicy};
pub use products::BuildProducts;
pub use state::{NodeState, StateError};
