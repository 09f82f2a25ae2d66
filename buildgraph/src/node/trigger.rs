//! Trigger payload: a manual gate over downstream execution.

use serde::{Deserialize, Serialize};

/// State carried by a trigger node.
///
/// The state machine is one-way: `Untriggered -> Triggered`. There is no
/// deactivation. While untriggered, every node listing the trigger among
/// its controlling triggers is blocked regardless of its own dependency
/// completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    triggered: bool,
    requires_recursive_workflow: bool,
    state_name: String,
    description_text: String,
    action_text: String,
}

impl TriggerState {
    /// Creates an untriggered state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the trigger as restarting the full downstream workflow when
    /// activated, rather than just the immediately gated nodes.
    #[must_use]
    pub fn with_recursive_workflow(mut self) -> Self {
        self.requires_recursive_workflow = true;
        self
    }

    /// Sets the state label shown while the trigger is pending.
    #[must_use]
    pub fn with_state_name(mut self, name: impl Into<String>) -> Self {
        self.state_name = name.into();
        self
    }

    /// Sets the description shown to the operator.
    #[must_use]
    pub fn with_description_text(mut self, text: impl Into<String>) -> Self {
        self.description_text = text.into();
        self
    }

    /// Sets the label of the activation action.
    #[must_use]
    pub fn with_action_text(mut self, text: impl Into<String>) -> Self {
        self.action_text = text.into();
        self
    }

    /// Returns true once the trigger has been activated.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Whether activation restarts the full downstream workflow.
    #[must_use]
    pub fn requires_recursive_workflow(&self) -> bool {
        self.requires_recursive_workflow
    }

    /// The pending-state label.
    #[must_use]
    pub fn state_name(&self) -> &str {
        &self.state_name
    }

    /// The operator-facing description.
    #[must_use]
    pub fn description_text(&self) -> &str {
        &self.description_text
    }

    /// The activation-action label.
    #[must_use]
    pub fn action_text(&self) -> &str {
        &self.action_text
    }

    /// Activates the trigger. Idempotent; there is no way back.
    pub fn activate(&mut self) {
        self.triggered = true;
    }
}
