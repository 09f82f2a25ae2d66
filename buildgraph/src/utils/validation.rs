//! Node-name validation.
//!
//! Names are the only pre-resolution identity in a graph, appear in
//! semicolon-delimited dependency lists, and are dot-joined into
//! controlling-trigger paths, so the delimiter characters are reserved.

use thiserror::Error;

/// Error raised for a malformed node name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeNameError {
    /// The name is empty or whitespace-only.
    #[error("node name cannot be empty")]
    Empty,

    /// The name contains a reserved character.
    #[error("node name '{name}' contains reserved character '{reserved}'")]
    ReservedCharacter {
        /// The offending name.
        name: String,
        /// The reserved character found in it.
        reserved: char,
    },
}

/// Validates a node name.
///
/// # Errors
///
/// Returns `NodeNameError` if the name is empty or contains one of the
/// reserved characters `;`, `.`, or whitespace.
pub fn validate_node_name(name: &str) -> Result<(), NodeNameError> {
    if name.trim().is_empty() {
        return Err(NodeNameError::Empty);
    }
    for reserved in [';', '.'] {
        if name.contains(reserved) {
            return Err(NodeNameError::ReservedCharacter {
                name: name.to_string(),
                reserved,
            });
        }
    }
    if let Some(ws) = name.chars().find(|c| c.is_whitespace()) {
        return Err(NodeNameError::ReservedCharacter {
            name: name.to_string(),
            reserved: ws,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_node_name("Compile").is_ok());
        assert!(validate_node_name("Shared_WaitForPromotion").is_ok());
        assert!(validate_node_name("CookedTests_Win64").is_ok());
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(validate_node_name(""), Err(NodeNameError::Empty));
        assert_eq!(validate_node_name("   "), Err(NodeNameError::Empty));
    }

    #[test]
    fn test_reserved_characters() {
        assert!(validate_node_name("A;B").is_err());
        assert!(validate_node_name("A.B").is_err());
        assert!(validate_node_name("A B").is_err());
    }
}
