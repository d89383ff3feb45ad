//! Workspace feature flags
//!
//! Flags are plain configuration values. Components that depend on a flag
//! receive it explicitly (see [`FeatureFlags::role_policy`]) instead of
//! reading shared mutable state.

use crate::members::RolePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Feature flags sourced from the workspace/provider context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Offer the `dataset_operator` role in the role menu
    pub dataset_operator_enabled: bool,

    /// Custom feature flags (key-value pairs)
    pub custom: HashMap<String, bool>,
}

impl FeatureFlags {
    /// Check a flag by name. Unknown names are disabled.
    pub fn is_enabled(&self, feature: &str) -> bool {
        match feature {
            "dataset_operator" | "dataset_operator_enabled" => self.dataset_operator_enabled,
            other => self.custom.get(other).copied().unwrap_or(false),
        }
    }

    /// Set a flag by name
    pub fn set(&mut self, feature: &str, enabled: bool) {
        match feature {
            "dataset_operator" | "dataset_operator_enabled" => {
                self.dataset_operator_enabled = enabled
            }
            other => {
                self.custom.insert(other.to_string(), enabled);
            }
        }
    }

    /// Role transition policy for the current flag values
    pub fn role_policy(&self) -> RolePolicy {
        RolePolicy::new(self.dataset_operator_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::Role;

    #[test]
    fn test_default_flags() {
        let flags = FeatureFlags::default();
        assert!(!flags.dataset_operator_enabled);
        assert!(!flags.is_enabled("dataset_operator"));
        assert!(!flags.is_enabled("anything_else"));
    }

    #[test]
    fn test_set_named_and_custom_flags() {
        let mut flags = FeatureFlags::default();

        flags.set("dataset_operator", true);
        assert!(flags.dataset_operator_enabled);

        flags.set("beta_menu", true);
        assert!(flags.is_enabled("beta_menu"));

        flags.set("beta_menu", false);
        assert!(!flags.is_enabled("beta_menu"));
    }

    #[test]
    fn test_role_policy_follows_flag() {
        let mut flags = FeatureFlags::default();
        assert!(!flags
            .role_policy()
            .assignable_roles(Some(Role::Owner))
            .contains(&Role::DatasetOperator));

        flags.dataset_operator_enabled = true;
        assert!(flags
            .role_policy()
            .assignable_roles(Some(Role::Owner))
            .contains(&Role::DatasetOperator));
    }
}
