//! Agent-affinity and scheduling hints.
//!
//! These values are opaque to the graph engine itself; they are carried so
//! an external scheduler can place ready nodes onto agents and apply
//! admission/cancellation policy.

use serde::{Deserialize, Serialize};

/// Scheduling metadata attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConstraints {
    /// Which execution-agent class may run the node.
    pub platform: String,
    /// Opaque capability/requirement string for agent selection.
    pub requirements: String,
    /// Label allowing multiple nodes to share one agent instance.
    pub sharing_group: String,
    /// Memory class required of the agent, in megabytes. Zero means no
    /// particular requirement.
    pub memory_requirement: u32,
    /// Scheduler timeout hint, in minutes.
    pub timeout_minutes: u32,
    /// Scheduling priority; higher runs earlier when agents are contended.
    pub priority: f32,
    /// How often the node runs under continuous integration: the node is
    /// skipped unless the build index is a multiple of `1 << frequency_shift`.
    pub frequency_shift: u32,
}

impl Default for AgentConstraints {
    fn default() -> Self {
        Self {
            platform: String::new(),
            requirements: String::new(),
            sharing_group: String::new(),
            memory_requirement: 0,
            timeout_minutes: 90,
            priority: 100.0,
            frequency_shift: 0,
        }
    }
}

impl AgentConstraints {
    /// Creates constraints with the default hints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the agent platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Sets the agent requirement string.
    #[must_use]
    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = requirements.into();
        self
    }

    /// Sets the agent sharing group.
    #[must_use]
    pub fn with_sharing_group(mut self, group: impl Into<String>) -> Self {
        self.sharing_group = group.into();
        self
    }

    /// Sets the memory requirement in megabytes.
    #[must_use]
    pub fn with_memory_requirement(mut self, megabytes: u32) -> Self {
        self.memory_requirement = megabytes;
        self
    }

    /// Sets the timeout hint in minutes.
    #[must_use]
    pub fn with_timeout_minutes(mut self, minutes: u32) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    /// Sets the scheduling priority.
    #[must_use]
    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the frequency shift.
    #[must_use]
    pub fn with_frequency_shift(mut self, shift: u32) -> Self {
        self.frequency_shift = shift;
        self
    }
}
