use std::sync::Arc;

use async_trait::async_trait;

use rolegate_core::{AppError, AppResult, NonEmptyString, RoleId};
use rolegate_domain::{Role, derive_slug, is_reserved_role_name};

/// Query parameters for role listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleListQuery {
    /// Optional substring filter on id, name, or slug.
    pub search: Option<String>,
    /// Maximum rows returned. Non-positive means unlimited.
    pub limit: i64,
    /// Number of rows skipped for offset pagination.
    pub offset: i64,
}

/// Repository port for role persistence.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds a role by its unique slug.
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Role>>;

    /// Finds a role by its identifier.
    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Lists roles, excluding system-reserved ones.
    async fn list_roles(&self, query: RoleListQuery) -> AppResult<Vec<Role>>;

    /// Creates a role with a unique name and pre-derived slug.
    async fn create_role(&self, name: &str, slug: &str) -> AppResult<Role>;

    /// Renames a role, replacing both name and slug.
    async fn update_role(&self, role_id: RoleId, name: &str, slug: &str) -> AppResult<Role>;

    /// Deletes a role in one transaction: remove the role row,
    /// reassign every user holding it to `default_role_id`, and delete
    /// its grant edges. Zero rows affected by the role delete aborts
    /// with a conflict (the role vanished concurrently); any failure
    /// rolls the whole call back.
    async fn delete_role_cascade(&self, role_id: RoleId, default_role_id: RoleId)
    -> AppResult<()>;
}

/// Application service for role lifecycle operations.
///
/// Role deletion is guarded: users referencing the deleted role are
/// reassigned to the configured default role within the same
/// transaction, so no committed state carries a dangling position.
#[derive(Clone)]
pub struct RoleService {
    repository: Arc<dyn RoleRepository>,
    default_role_id: RoleId,
}

impl RoleService {
    /// Creates a new service from the repository and the configured
    /// fallback role for displaced users.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleRepository>, default_role_id: RoleId) -> Self {
        Self {
            repository,
            default_role_id,
        }
    }

    /// Lists roles, excluding system-reserved ones.
    pub async fn list_roles(&self, query: RoleListQuery) -> AppResult<Vec<Role>> {
        self.repository.list_roles(query).await
    }

    /// Returns a role by id.
    pub async fn get_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.repository
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    /// Returns a role by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Role>> {
        self.repository.find_by_slug(slug).await
    }

    /// Creates a role, deriving its slug from the name.
    pub async fn create_role(&self, name: &str) -> AppResult<Role> {
        let name = NonEmptyString::new(name)?;
        let slug = derive_slug(name.as_str());
        self.repository.create_role(name.as_str(), &slug).await
    }

    /// Renames a role, re-deriving its slug. System-reserved roles
    /// cannot be renamed.
    pub async fn update_role(&self, role_id: RoleId, name: &str) -> AppResult<Role> {
        let name = NonEmptyString::new(name)?;

        let existing = self
            .repository
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        if is_reserved_role_name(&existing.name) {
            return Err(AppError::Validation(format!(
                "role '{}' is system-reserved and cannot be renamed",
                existing.name
            )));
        }

        let slug = derive_slug(name.as_str());
        self.repository
            .update_role(role_id, name.as_str(), &slug)
            .await
    }

    /// Deletes a role atomically, reassigning its users to the
    /// configured default role and removing its grant edges.
    ///
    /// The identifier arrives raw from the transport layer: a value
    /// that does not parse as an id is a validation error, a
    /// well-formed id without a matching role is not-found.
    ///
    /// System-reserved roles and the configured default role are not
    /// deletable; removing the fallback role would leave displaced
    /// users reassigned to a role that no longer exists.
    pub async fn delete_role(&self, raw_id: &str) -> AppResult<()> {
        let role_id = raw_id
            .trim()
            .parse::<i64>()
            .map(RoleId::new)
            .map_err(|_| AppError::Validation(format!("invalid role id '{raw_id}'")))?;

        let role = self
            .repository
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        if is_reserved_role_name(&role.name) {
            return Err(AppError::Validation(format!(
                "role '{}' is system-reserved and cannot be deleted",
                role.name
            )));
        }
        if role_id == self.default_role_id {
            return Err(AppError::Validation(format!(
                "role '{role_id}' is the fallback for displaced users and cannot be deleted"
            )));
        }

        self.repository
            .delete_role_cascade(role_id, self.default_role_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use rolegate_core::{AppError, AppResult, RoleId};
    use rolegate_domain::Role;

    use super::{RoleListQuery, RoleRepository, RoleService};

    #[derive(Default)]
    struct FakeRoleRepository {
        roles: Mutex<Vec<Role>>,
        cascade_calls: Mutex<Vec<(RoleId, RoleId)>>,
        fail_cascade: bool,
    }

    #[async_trait]
    impl RoleRepository for FakeRoleRepository {
        async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.slug == slug)
                .cloned())
        }

        async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.id == role_id)
                .cloned())
        }

        async fn list_roles(&self, _query: RoleListQuery) -> AppResult<Vec<Role>> {
            Ok(self.roles.lock().await.clone())
        }

        async fn create_role(&self, name: &str, slug: &str) -> AppResult<Role> {
            let mut roles = self.roles.lock().await;
            if roles.iter().any(|role| role.name == name) {
                return Err(AppError::Conflict(format!("role '{name}' already exists")));
            }

            let role = Role {
                id: RoleId::new(roles.len() as i64 + 1),
                name: name.to_owned(),
                slug: slug.to_owned(),
            };
            roles.push(role.clone());
            Ok(role)
        }

        async fn update_role(&self, role_id: RoleId, name: &str, slug: &str) -> AppResult<Role> {
            let mut roles = self.roles.lock().await;
            let role = roles
                .iter_mut()
                .find(|role| role.id == role_id)
                .ok_or_else(|| AppError::NotFound("role".to_owned()))?;
            role.name = name.to_owned();
            role.slug = slug.to_owned();
            Ok(role.clone())
        }

        async fn delete_role_cascade(
            &self,
            role_id: RoleId,
            default_role_id: RoleId,
        ) -> AppResult<()> {
            if self.fail_cascade {
                return Err(AppError::TransactionFailure(
                    "simulated store abort".to_owned(),
                ));
            }

            self.cascade_calls
                .lock()
                .await
                .push((role_id, default_role_id));
            self.roles.lock().await.retain(|role| role.id != role_id);
            Ok(())
        }
    }

    fn repository_with_role(id: i64, name: &str, slug: &str) -> Arc<FakeRoleRepository> {
        let repository = Arc::new(FakeRoleRepository::default());
        if let Ok(mut roles) = repository.roles.try_lock() {
            roles.push(Role {
                id: RoleId::new(id),
                name: name.to_owned(),
                slug: slug.to_owned(),
            });
        }
        repository
    }

    #[tokio::test]
    async fn create_role_derives_slug_from_name() {
        let repository = Arc::new(FakeRoleRepository::default());
        let service = RoleService::new(repository, RoleId::new(2));

        let role = service.create_role("Warehouse Staff").await;
        assert!(role.is_ok());
        assert_eq!(
            role.unwrap_or_else(|_| unreachable!()).slug,
            "warehousestaff"
        );
    }

    #[tokio::test]
    async fn create_role_rejects_blank_name() {
        let repository = Arc::new(FakeRoleRepository::default());
        let service = RoleService::new(repository, RoleId::new(2));

        let result = service.create_role("   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_role_name_is_a_conflict() {
        let repository = repository_with_role(1, "Cashier", "cashier");
        let service = RoleService::new(repository, RoleId::new(2));

        let result = service.create_role("Cashier").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn delete_role_rejects_malformed_id() {
        let repository = Arc::new(FakeRoleRepository::default());
        let service = RoleService::new(repository, RoleId::new(2));

        let result = service.delete_role("not-a-number").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn delete_role_requires_existing_role() {
        let repository = Arc::new(FakeRoleRepository::default());
        let service = RoleService::new(repository, RoleId::new(2));

        let result = service.delete_role("7").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_role_cascades_with_configured_default() {
        let repository = repository_with_role(7, "Cashier", "cashier");
        let service = RoleService::new(repository.clone(), RoleId::new(2));

        let result = service.delete_role("7").await;
        assert!(result.is_ok());

        let calls = repository.cascade_calls.lock().await;
        assert_eq!(calls.as_slice(), &[(RoleId::new(7), RoleId::new(2))]);
    }

    #[tokio::test]
    async fn reserved_roles_cannot_be_deleted() {
        let repository = repository_with_role(2, "User", "user");
        let service = RoleService::new(repository.clone(), RoleId::new(2));

        let result = service.delete_role("2").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        // The role survives and no cascade ran, so no user was
        // reassigned to a deleted role id.
        assert_eq!(repository.roles.lock().await.len(), 1);
        assert!(repository.cascade_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn reserved_roles_cannot_be_renamed() {
        let repository = repository_with_role(1, "Administrator", "administrator");
        let service = RoleService::new(repository.clone(), RoleId::new(2));

        let result = service.update_role(RoleId::new(1), "Root").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let roles = repository.roles.lock().await;
        assert_eq!(roles[0].name, "Administrator");
    }

    #[tokio::test]
    async fn the_fallback_role_cannot_be_deleted() {
        let repository = repository_with_role(9, "Contractor", "contractor");
        let service = RoleService::new(repository.clone(), RoleId::new(9));

        let result = service.delete_role("9").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repository.cascade_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_cascade_leaves_role_in_place() {
        let repository = Arc::new(FakeRoleRepository {
            fail_cascade: true,
            ..FakeRoleRepository::default()
        });
        {
            let mut roles = repository.roles.lock().await;
            roles.push(Role {
                id: RoleId::new(7),
                name: "Cashier".to_owned(),
                slug: "cashier".to_owned(),
            });
        }
        let service = RoleService::new(repository.clone(), RoleId::new(2));

        let result = service.delete_role("7").await;
        assert!(matches!(result, Err(AppError::TransactionFailure(_))));
        assert_eq!(repository.roles.lock().await.len(), 1);
    }
}
