use rolegate_core::RoleId;
use serde::{Deserialize, Serialize};

/// Role names reserved for the system. These roles are excluded from
/// normal role listing and editing endpoints.
pub const RESERVED_ROLE_NAMES: &[&str] = &["Administrator", "User"];

/// Returns whether a role name is system-reserved.
#[must_use]
pub fn is_reserved_role_name(name: &str) -> bool {
    RESERVED_ROLE_NAMES.contains(&name)
}

/// A position a user can hold. Carries zero or more permission grants
/// through the role-permission edge table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Unique normalized slug derived from the name.
    pub slug: String,
}

#[cfg(test)]
mod tests {
    use super::is_reserved_role_name;

    #[test]
    fn administrator_and_user_are_reserved() {
        assert!(is_reserved_role_name("Administrator"));
        assert!(is_reserved_role_name("User"));
    }

    #[test]
    fn custom_role_names_are_not_reserved() {
        assert!(!is_reserved_role_name("Warehouse Staff"));
        assert!(!is_reserved_role_name("administrator"));
    }
}
