//! Declarative notification policy.
//!
//! The graph carries these flags for pipeline reports; it never sends mail
//! itself.

use serde::{Deserialize, Serialize};

/// Email policy attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPolicy {
    /// Space-delimited list of failure-notification recipients.
    pub recipients_for_failure: String,
    /// Whether submitters of recent changes are added to failure emails.
    pub add_submitters_to_failure: bool,
    /// Whether a success email is sent for this node.
    pub send_success: bool,
}

impl EmailPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure recipients.
    #[must_use]
    pub fn with_failure_recipients(mut self, recipients: impl Into<String>) -> Self {
        self.recipients_for_failure = recipients.into();
        self
    }

    /// Marks submitters to be added to failure emails.
    #[must_use]
    pub fn with_submitters_on_failure(mut self) -> Self {
        self.add_submitters_to_failure = true;
        self
    }

    /// Marks the node as sending a success email.
    #[must_use]
    pub fn with_success_email(mut self) -> Self {
        self.send_success = true;
        self
    }
}

/// Merges space-delimited recipient lists, dropping duplicates while
/// preserving first-occurrence order.
#[must_use]
pub fn merge_recipient_lists(lists: &[&str]) -> String {
    let mut merged: Vec<&str> = Vec::new();
    for list in lists {
        for recipient in list.split(' ') {
            if !recipient.is_empty() && !merged.contains(&recipient) {
                merged.push(recipient);
            }
        }
    }
    merged.join(" ")
}
