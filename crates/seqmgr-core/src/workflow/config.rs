//! Workflow configuration.

use serde::{Deserialize, Serialize};

/// What to do when deleting a sequence that consumers still reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Delete anyway and warn about the dependent consumers.
    #[default]
    Warn,
    /// Refuse to delete while any consumer references the sequence.
    Block,
}

/// Sequence workflow configuration.
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    /// Policy for deleting sequences that are in use.
    pub delete_policy: DeletePolicy,
}

impl WorkflowConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delete policy.
    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Check if deleting in-use sequences is refused.
    pub fn blocks_in_use_delete(&self) -> bool {
        self.delete_policy == DeletePolicy::Block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_warns() {
        let config = WorkflowConfig::default();
        assert_eq!(config.delete_policy, DeletePolicy::Warn);
        assert!(!config.blocks_in_use_delete());
    }

    #[test]
    fn test_config_builder() {
        let config = WorkflowConfig::new().with_delete_policy(DeletePolicy::Block);
        assert!(config.blocks_in_use_delete());
    }
}
