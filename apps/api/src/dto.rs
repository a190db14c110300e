//! Request and response shapes for the HTTP surface.

use rolegate_application::{RolePermissionSummary, SubjectGrants, UserWithRole};
use rolegate_domain::{GrantDeclaration, Role, Subject, User};
use serde::{Deserialize, Serialize};

/// Health check payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for account registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Optional explicit position; the configured default role is
    /// assigned when omitted.
    pub position: Option<i64>,
}

/// Incoming payload for credential login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login result: bearer token plus the caller's capability snapshot.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
    pub role: String,
    pub permissions: Vec<SubjectGrantsResponse>,
}

/// API representation of a user account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub position: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.as_i64(),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            position: user.position.as_i64(),
        }
    }
}

/// Listing row joining the role name onto the user.
#[derive(Debug, Serialize)]
pub struct UserWithRoleResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub role: String,
}

impl From<UserWithRole> for UserWithRoleResponse {
    fn from(row: UserWithRole) -> Self {
        Self {
            user: UserResponse::from(row.user),
            role: row.role_name,
        }
    }
}

/// Incoming payload for partial user updates.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<i64>,
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// Incoming payload for role rename.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: String,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id.as_i64(),
            name: role.name,
            slug: role.slug,
        }
    }
}

/// Incoming payload replacing a role's whole permission set. Each
/// entry carries either named actions or positional boolean flags.
#[derive(Debug, Deserialize)]
pub struct ReplacePermissionsRequest {
    pub permissions: Vec<GrantDeclaration>,
}

/// Grouped subject grants as returned by the resolvers.
#[derive(Debug, Serialize)]
pub struct SubjectGrantsResponse {
    pub subject: String,
    pub actions: Vec<String>,
}

impl From<SubjectGrants> for SubjectGrantsResponse {
    fn from(grants: SubjectGrants) -> Self {
        Self {
            subject: grants.subject,
            actions: grants.actions,
        }
    }
}

/// Flat capability view of one role.
#[derive(Debug, Serialize)]
pub struct RolePermissionSummaryResponse {
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<RolePermissionSummary> for RolePermissionSummaryResponse {
    fn from(summary: RolePermissionSummary) -> Self {
        Self {
            name: summary.name,
            permissions: summary.permissions,
        }
    }
}

/// API representation of a catalog subject.
#[derive(Debug, Serialize)]
pub struct SubjectResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id.as_i64(),
            name: subject.name,
            slug: subject.slug,
        }
    }
}

/// Common listing query parameters.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub per_page: Option<i64>,
    pub page: Option<i64>,
}

impl ListQuery {
    /// Resolves the page size, defaulting to 10 rows.
    pub fn limit(&self) -> i64 {
        self.per_page.filter(|size| *size > 0).unwrap_or(10)
    }

    /// Resolves the row offset from the 1-based page number.
    pub fn offset(&self) -> i64 {
        let page = self.page.filter(|page| *page > 0).unwrap_or(1);
        (page - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use rolegate_domain::ActionSet;

    use super::{ListQuery, ReplacePermissionsRequest};

    #[test]
    fn named_action_payload_deserializes() {
        let payload: Result<ReplacePermissionsRequest, _> = serde_json::from_str(
            r#"{"permissions": [{"subject": "Invoice", "actions": ["read", "create"]}]}"#,
        );
        assert!(payload.is_ok());
        let payload = payload.unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            payload.permissions[0].actions,
            ActionSet::Named(_)
        ));
    }

    #[test]
    fn flag_action_payload_deserializes() {
        let payload: Result<ReplacePermissionsRequest, _> = serde_json::from_str(
            r#"{"permissions": [{"subject": "Invoice", "actions": [true, false, true, false]}]}"#,
        );
        assert!(payload.is_ok());
        let payload = payload.unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            payload.permissions[0].actions,
            ActionSet::Flags(_)
        ));
    }

    #[test]
    fn list_query_defaults_to_first_page_of_ten() {
        let query = ListQuery::default();
        assert_eq!(query.limit(), 10);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn list_query_pages_are_one_based() {
        let query = ListQuery {
            search: None,
            per_page: Some(25),
            page: Some(3),
        };
        assert_eq!(query.limit(), 25);
        assert_eq!(query.offset(), 50);
    }
}
