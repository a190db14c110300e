use std::sync::Arc;

use rolegate_core::{AppError, AppResult};
use rolegate_domain::{GrantDeclaration, GrantPolicy, ResolvedGrant};

use crate::permission_ports::RbacWriteRepository;
use crate::role_service::RoleRepository;

/// Rewrites a role's entire permission set from a submitted
/// declaration.
///
/// Replacement is wholesale: omitting a previously granted subject
/// revokes it. Partial updates are not supported.
#[derive(Clone)]
pub struct PermissionWriter {
    write_repository: Arc<dyn RbacWriteRepository>,
    role_repository: Arc<dyn RoleRepository>,
}

impl PermissionWriter {
    /// Creates a new writer from the write and role repositories.
    #[must_use]
    pub fn new(
        write_repository: Arc<dyn RbacWriteRepository>,
        role_repository: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            write_repository,
            role_repository,
        }
    }

    /// Atomically replaces the permission set of the role identified
    /// by `role_slug` with the declared grants.
    ///
    /// An unknown slug fails fast with a validation error before any
    /// transaction is opened. Declared action sets are normalized
    /// first (named lists deduplicated, boolean flags mapped against
    /// the fixed action order); the store then resolves each pair
    /// under `policy` and commits all-or-nothing.
    pub async fn replace_role_permissions(
        &self,
        role_slug: &str,
        declarations: Vec<GrantDeclaration>,
        policy: GrantPolicy,
    ) -> AppResult<()> {
        let role = self
            .role_repository
            .find_by_slug(role_slug)
            .await?
            .ok_or_else(|| AppError::Validation(format!("invalid role slug '{role_slug}'")))?;

        let grants: Vec<ResolvedGrant> = declarations.iter().map(ResolvedGrant::from).collect();

        self.write_repository
            .replace_role_grants(role.id, grants, policy)
            .await
    }
}
