//! Small shared helpers for timestamps and name validation.

pub mod timestamps;
pub mod validation;

pub use timestamps::{iso_timestamp, now_utc, Timestamp};
pub use validation::{validate_node_name, NodeNameError};
