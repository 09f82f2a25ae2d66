//! Declarative step descriptions: the external input a graph is built from.
//!
//! A declaration links to other steps by name only. Names are resolved to
//! checked references exactly once, when the builder constructs the graph.

use crate::core::{AgentConstraints, EmailPolicy};
use crate::node::{BuildAction, NoOpAction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::NodeSpec;

/// Splits a semicolon-delimited name list, trimming entries and dropping
/// empties and duplicates while preserving first-occurrence order.
#[must_use]
pub fn split_name_list(raw: &str) -> Vec<String> {
    let mut names = Vec::new();
    for entry in raw.split(';') {
        let entry = entry.trim();
        if !entry.is_empty() && !names.iter().any(|n| n == entry) {
            names.push(entry.to_string());
        }
    }
    names
}

/// A single declared build step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDeclaration {
    /// Unique step name.
    pub name: String,
    /// Semicolon-delimited input-dependency names.
    pub dependencies: String,
    /// Semicolon-delimited order-dependency names.
    pub order_dependencies: String,
    /// Semicolon-delimited controlling-trigger names.
    pub triggers: String,
    /// Which execution-agent class may run this step.
    pub agent_platform: String,
    /// Opaque capability/requirement string for agent selection.
    pub agent_requirements: String,
    /// Label allowing multiple steps to share one agent instance.
    pub agent_sharing_group: String,
    /// Memory class required of the agent, in megabytes.
    pub agent_memory_requirement: u32,
    /// Scheduler timeout hint, in minutes.
    pub timeout_minutes: u32,
    /// Scheduling priority.
    pub priority: f32,
    /// Continuous-integration frequency shift.
    pub frequency_shift: u32,
    /// Game scope used for temp storage.
    pub game_scope: String,
    /// Storage root used for temp storage.
    pub storage_root: String,
    /// Display grouping label.
    pub display_group: String,
    /// Whether the step persists across graph re-evaluations.
    pub is_sticky: bool,
    /// Whether the step is a test.
    pub is_test: bool,
    /// Whether submitters of recent changes are added to failure emails.
    pub add_submitters_to_failure_emails: bool,
    /// Whether a success email is sent.
    pub send_success_email: bool,
    /// Space-delimited failure-notification recipients.
    pub recipients_for_failure_emails: String,
}

impl Default for StepDeclaration {
    fn default() -> Self {
        Self {
            name: String::new(),
            dependencies: String::new(),
            order_dependencies: String::new(),
            triggers: String::new(),
            agent_platform: String::new(),
            agent_requirements: String::new(),
            agent_sharing_group: String::new(),
            agent_memory_requirement: 0,
            timeout_minutes: 90,
            priority: 100.0,
            frequency_shift: 0,
            game_scope: String::new(),
            storage_root: String::new(),
            display_group: String::new(),
            is_sticky: false,
            is_test: false,
            add_submitters_to_failure_emails: false,
            send_success_email: false,
            recipients_for_failure_emails: String::new(),
        }
    }
}

impl StepDeclaration {
    /// Creates a declaration with default metadata.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the input-dependency name list.
    #[must_use]
    pub fn with_dependencies(mut self, raw: impl Into<String>) -> Self {
        self.dependencies = raw.into();
        self
    }

    /// Sets the order-dependency name list.
    #[must_use]
    pub fn with_order_dependencies(mut self, raw: impl Into<String>) -> Self {
        self.order_dependencies = raw.into();
        self
    }

    /// Sets the controlling-trigger name list.
    #[must_use]
    pub fn with_triggers(mut self, raw: impl Into<String>) -> Self {
        self.triggers = raw.into();
        self
    }

    /// Sets the game scope for temp storage.
    #[must_use]
    pub fn with_game_scope(mut self, scope: impl Into<String>) -> Self {
        self.game_scope = scope.into();
        self
    }

    /// Sets the frequency shift.
    #[must_use]
    pub fn with_frequency_shift(mut self, shift: u32) -> Self {
        self.frequency_shift = shift;
        self
    }

    /// Every dependency name this step declares (input first, then order),
    /// as declared, without transitive expansion.
    #[must_use]
    pub fn declared_dependency_names(&self) -> Vec<String> {
        let mut names = split_name_list(&self.dependencies);
        for name in split_name_list(&self.order_dependencies) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Converts the declaration into a node specification running `action`.
    #[must_use]
    pub fn to_spec_with_action(&self, action: Arc<dyn BuildAction>) -> NodeSpec {
        let agent = AgentConstraints {
            platform: self.agent_platform.clone(),
            requirements: self.agent_requirements.clone(),
            sharing_group: self.agent_sharing_group.clone(),
            memory_requirement: self.agent_memory_requirement,
            timeout_minutes: self.timeout_minutes,
            priority: self.priority,
            frequency_shift: self.frequency_shift,
        };
        let emails = EmailPolicy {
            recipients_for_failure: self.recipients_for_failure_emails.clone(),
            add_submitters_to_failure: self.add_submitters_to_failure_emails,
            send_success: self.send_success_email,
        };

        let mut spec = NodeSpec::new(&self.name, action)
            .with_agent(agent)
            .with_emails(emails)
            .with_display_group(&self.display_group)
            .with_game_scope(&self.game_scope)
            .with_storage_root(&self.storage_root);
        for dep in split_name_list(&self.dependencies) {
            spec = spec.with_input_dependency(dep);
        }
        for dep in split_name_list(&self.order_dependencies) {
            spec = spec.with_order_dependency(dep);
        }
        for trigger in split_name_list(&self.triggers) {
            spec = spec.with_controlling_trigger(trigger);
        }
        if self.is_sticky {
            spec = spec.sticky();
        }
        if self.is_test {
            spec = spec.test();
        }
        spec
    }

    /// Converts the declaration into a node specification with a no-op
    /// action; the graph's record-of-success padding supplies its product.
    #[must_use]
    pub fn to_spec(&self) -> NodeSpec {
        self.to_spec_with_action(Arc::new(NoOpAction::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_list() {
        assert_eq!(
            split_name_list("A; B ;;C;A"),
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
        assert!(split_name_list("").is_empty());
        assert!(split_name_list(" ; ; ").is_empty());
    }

    #[test]
    fn test_declared_dependency_names_unions_both_lists() {
        let decl = StepDeclaration::new("Package")
            .with_dependencies("Cook;Stage")
            .with_order_dependencies("Stage;Labels");
        assert_eq!(
            decl.declared_dependency_names(),
            vec!["Cook".to_string(), "Stage".to_string(), "Labels".to_string()]
        );
    }

    #[test]
    fn test_deserialization_fills_defaults() {
        let decl: StepDeclaration =
            serde_json::from_str(r#"{"name": "Compile", "dependencies": "Version"}"#).unwrap();
        assert_eq!(decl.name, "Compile");
        assert_eq!(decl.timeout_minutes, 90);
        assert!((decl.priority - 100.0).abs() < f32::EPSILON);
        assert!(!decl.is_sticky);
    }

    #[test]
    fn test_to_spec_carries_metadata() {
        let mut decl = StepDeclaration::new("CookPlatform")
            .with_dependencies("Editor")
            .with_triggers("ReleaseGate")
            .with_game_scope("Shooter");
        decl.agent_sharing_group = "Shared_Cookers".to_string();
        decl.recipients_for_failure_emails = "cooks@example.com".to_string();

        let spec = decl.to_spec();
        assert_eq!(spec.name(), "CookPlatform");
        assert_eq!(spec.input_dependencies(), &["Editor"]);
        assert_eq!(spec.controlling_triggers(), &["ReleaseGate"]);
        assert_eq!(spec.agent().sharing_group, "Shared_Cookers");
        assert_eq!(spec.emails().recipients_for_failure, "cooks@example.com");
        assert_eq!(spec.game_scope(), "Shooter");
    }
}
