//! Role transition policy
//!
//! Which roles an operator may hand out depends only on the operator's own
//! role and on the `dataset_operator` feature flag.

use super::role::Role;
use super::types::Member;

/// Maps an operator role to the ordered list of roles it may assign
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolePolicy {
    dataset_operator_enabled: bool,
}

/// One selectable entry of the role menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleMenuEntry {
    pub role: Role,
    /// The member currently holds this role
    pub selected: bool,
}

/// Role menu for a single member row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMenu {
    /// The member's current role. Always shown on the menu button, even when
    /// the operator could not assign it.
    pub current: Role,
    pub entries: Vec<RoleMenuEntry>,
}

impl RoleMenu {
    /// Roles offered for assignment, in menu order
    pub fn roles(&self) -> Vec<Role> {
        self.entries.iter().map(|e| e.role).collect()
    }
}

impl RolePolicy {
    pub fn new(dataset_operator_enabled: bool) -> Self {
        Self {
            dataset_operator_enabled,
        }
    }

    pub fn dataset_operator_enabled(&self) -> bool {
        self.dataset_operator_enabled
    }

    /// Roles the operator may assign. `None` stands for an operator role
    /// outside the closed set and yields no entries.
    pub fn assignable_roles(&self, operator: Option<Role>) -> Vec<Role> {
        let mut roles = match operator {
            Some(Role::Owner) => vec![Role::Admin, Role::Editor, Role::Normal],
            Some(Role::Admin) => vec![Role::Editor, Role::Normal],
            _ => return Vec::new(),
        };

        if self.dataset_operator_enabled {
            roles.push(Role::DatasetOperator);
        }
        roles
    }

    /// Build the role menu shown for `member` to `operator`
    pub fn menu(&self, member: &Member, operator: Option<Role>) -> RoleMenu {
        let entries = self
            .assignable_roles(operator)
            .into_iter()
            .map(|role| RoleMenuEntry {
                role,
                selected: role == member.role,
            })
            .collect();

        RoleMenu {
            current: member.role,
            entries,
        }
    }
}

/// Assignable roles for a raw operator-role string
pub fn compute_assignable_roles(operator_role: &str, dataset_operator_enabled: bool) -> Vec<Role> {
    RolePolicy::new(dataset_operator_enabled).assignable_roles(Role::parse(operator_role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_without_flag() {
        assert_eq!(
            compute_assignable_roles("owner", false),
            vec![Role::Admin, Role::Editor, Role::Normal]
        );
    }

    #[test]
    fn test_owner_with_flag() {
        assert_eq!(
            compute_assignable_roles("owner", true),
            vec![Role::Admin, Role::Editor, Role::Normal, Role::DatasetOperator]
        );
    }

    #[test]
    fn test_admin_with_and_without_flag() {
        assert_eq!(
            compute_assignable_roles("admin", true),
            vec![Role::Editor, Role::Normal, Role::DatasetOperator]
        );
        assert_eq!(
            compute_assignable_roles("admin", false),
            vec![Role::Editor, Role::Normal]
        );
    }

    #[test]
    fn test_other_operators_get_nothing() {
        for operator in ["editor", "normal", "dataset_operator", "root", ""] {
            assert!(compute_assignable_roles(operator, true).is_empty(), "{}", operator);
        }
    }

    #[test]
    fn test_menu_marks_current_role() {
        let policy = RolePolicy::new(false);
        let member = Member::new("m-1", Role::Editor);

        let menu = policy.menu(&member, Some(Role::Owner));
        assert_eq!(menu.current, Role::Editor);
        let selected: Vec<Role> = menu
            .entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.role)
            .collect();
        assert_eq!(selected, vec![Role::Editor]);
    }

    #[test]
    fn test_menu_keeps_current_role_outside_assignable_list() {
        let policy = RolePolicy::new(false);
        let member = Member::new("m-1", Role::DatasetOperator);

        let menu = policy.menu(&member, Some(Role::Admin));
        assert_eq!(menu.current, Role::DatasetOperator);
        assert_eq!(menu.roles(), vec![Role::Editor, Role::Normal]);
        assert!(menu.entries.iter().all(|e| !e.selected));
    }

    #[test]
    fn test_menu_for_non_manager_is_empty() {
        let policy = RolePolicy::new(true);
        let member = Member::new("m-1", Role::Normal);

        let menu = policy.menu(&member, Some(Role::Editor));
        assert_eq!(menu.current, Role::Normal);
        assert!(menu.entries.is_empty());
    }
}
