use std::sync::Arc;

use rolegate_core::{AppError, AppResult, RoleId, UserId};
use rolegate_domain::Subject;

use crate::permission_ports::{RbacQueryRepository, RolePermissionSummary, SubjectGrants};
use crate::role_service::RoleRepository;

/// Read-only resolution of effective permission sets.
///
/// Used by the login flow to embed a capability snapshot in the
/// authenticated response and by the permission query endpoints.
#[derive(Clone)]
pub struct PermissionResolver {
    query_repository: Arc<dyn RbacQueryRepository>,
    role_repository: Arc<dyn RoleRepository>,
}

impl PermissionResolver {
    /// Creates a new resolver from the query and role repositories.
    #[must_use]
    pub fn new(
        query_repository: Arc<dyn RbacQueryRepository>,
        role_repository: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            query_repository,
            role_repository,
        }
    }

    /// Computes the grouped effective permission set of a role.
    ///
    /// Unknown role ids and roles without grants both resolve to an
    /// empty mapping; callers decide whether empty is meaningful.
    pub async fn resolve_for_role(&self, role_id: RoleId) -> AppResult<Vec<SubjectGrants>> {
        self.query_repository.grants_for_role(role_id).await
    }

    /// Computes the grouped effective permission set of a user through
    /// their position. Unknown user ids resolve to an empty mapping.
    pub async fn resolve_for_user(&self, user_id: UserId) -> AppResult<Vec<SubjectGrants>> {
        self.query_repository.grants_for_user(user_id).await
    }

    /// Resolves a role slug into its flat capability-token list.
    ///
    /// Distinguishes three outcomes: an unknown slug is `NotFound`, a
    /// role without grants returns an empty token list, and a granted
    /// role returns its `"subjectSlug.actionName"` tokens.
    pub async fn resolve_for_role_by_slug(&self, slug: &str) -> AppResult<RolePermissionSummary> {
        let role = self
            .role_repository
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{slug}' was not found")))?;

        let permissions = self.query_repository.flat_grants_for_role(role.id).await?;

        Ok(RolePermissionSummary {
            name: role.name,
            permissions,
        })
    }

    /// Returns the grouped view of the whole permission catalog.
    pub async fn permission_catalog(&self) -> AppResult<Vec<SubjectGrants>> {
        self.query_repository.permission_catalog().await
    }

    /// Lists all subjects in the catalog.
    pub async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        self.query_repository.list_subjects().await
    }
}
