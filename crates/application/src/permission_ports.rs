use async_trait::async_trait;

use rolegate_core::{AppResult, RoleId, UserId};
use rolegate_domain::{GrantPolicy, ResolvedGrant, Subject};

/// Grouped effective permissions for one subject: the subject display
/// name and the distinct action names granted on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGrants {
    /// Subject display name.
    pub subject: String,
    /// Distinct allowed action names. Order is stable within one
    /// query but not guaranteed sorted.
    pub actions: Vec<String>,
}

/// Flat capability view of one role, used by client-side route guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissionSummary {
    /// Role display name.
    pub name: String,
    /// Dot-joined `"subjectSlug.actionName"` tokens. Empty for a role
    /// that exists but holds no grants.
    pub permissions: Vec<String>,
}

/// Read-only repository port over the grant tables.
///
/// All reads represent absence as an empty collection, never an error:
/// a role or user without grants is a valid, common state.
#[async_trait]
pub trait RbacQueryRepository: Send + Sync {
    /// Returns the grouped effective permission set of a role. Unknown
    /// role ids yield an empty mapping.
    async fn grants_for_role(&self, role_id: RoleId) -> AppResult<Vec<SubjectGrants>>;

    /// Returns the grouped effective permission set of a user through
    /// their position. Unknown user ids yield an empty mapping.
    async fn grants_for_user(&self, user_id: UserId) -> AppResult<Vec<SubjectGrants>>;

    /// Returns flat `"subjectSlug.actionName"` tokens for a role.
    async fn flat_grants_for_role(&self, role_id: RoleId) -> AppResult<Vec<String>>;

    /// Returns the grouped view of the whole permission catalog,
    /// independent of any role.
    async fn permission_catalog(&self) -> AppResult<Vec<SubjectGrants>>;

    /// Lists all subjects in the catalog.
    async fn list_subjects(&self) -> AppResult<Vec<Subject>>;
}

/// Write-side repository port for rewriting a role's grant set.
#[async_trait]
pub trait RbacWriteRepository: Send + Sync {
    /// Atomically replaces every grant edge of a role with the edges
    /// derived from the given declarations.
    ///
    /// Runs as one transaction: delete all existing edges for the
    /// role, resolve each declared (subject, action) pair against the
    /// preloaded catalogs under `policy`, create missing permission
    /// rows lazily, and insert edges if absent. Any failure rolls the
    /// whole call back, leaving the role's grant set untouched.
    async fn replace_role_grants(
        &self,
        role_id: RoleId,
        grants: Vec<ResolvedGrant>,
        policy: GrantPolicy,
    ) -> AppResult<()>;
}
