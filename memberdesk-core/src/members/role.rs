//! Workspace roles
//!
//! The role set is closed. Display labels are resolved through an exhaustive
//! match, so adding a variant without a label is a compile error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role held by a workspace member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control over the workspace, including billing and ownership
    Owner,
    /// Manages members and settings
    Admin,
    /// Builds and edits apps
    Editor,
    /// Uses published apps only
    Normal,
    /// Manages datasets without app access
    DatasetOperator,
}

impl Role {
    /// Every role, in menu order
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Admin,
        Role::Editor,
        Role::Normal,
        Role::DatasetOperator,
    ];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Normal => "normal",
            Role::DatasetOperator => "dataset_operator",
        }
    }

    /// Parse a wire name. Anything outside the closed set is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            "normal" => Some(Role::Normal),
            "dataset_operator" => Some(Role::DatasetOperator),
            _ => None,
        }
    }

    /// Message key of the role's display name
    pub fn label_key(&self) -> &'static str {
        match self {
            Role::Owner => "common.members.owner",
            Role::Admin => "common.members.admin",
            Role::Editor => "common.members.editor",
            Role::Normal => "common.members.normal",
            Role::DatasetOperator => "common.members.datasetOperator",
        }
    }

    /// Message key of the one-line description shown under the name
    pub fn tip_key(&self) -> &'static str {
        match self {
            Role::Owner => "common.members.ownerTip",
            Role::Admin => "common.members.adminTip",
            Role::Editor => "common.members.editorTip",
            Role::Normal => "common.members.normalTip",
            Role::DatasetOperator => "common.members.datasetOperatorTip",
        }
    }

    /// Whether this role may manage other members at all
    pub fn can_manage_members(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role to display for a raw role string.
///
/// Unknown strings display as [`Role::Normal`]; this is the documented
/// default, not an error.
pub fn display_role(raw: &str) -> Role {
    Role::parse(raw).unwrap_or(Role::Normal)
}
