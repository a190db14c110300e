//! User management ports and application service.
//!
//! Owns registration (including username derivation), credential
//! verification, and administrative user listing/maintenance.

use std::sync::Arc;

use async_trait::async_trait;

use rolegate_core::{AppError, AppResult, NonEmptyString, RoleId, UserId};
use rolegate_domain::{EmailAddress, User, derive_username_base, validate_password};

use crate::role_service::RoleRepository;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// User record returned by repository queries, including the stored
/// credential hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique derived username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2id password hash.
    pub password_hash: String,
    /// Role held by the user.
    pub position: RoleId,
}

impl UserRecord {
    /// Converts the record into the credential-free domain entity.
    #[must_use]
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            email: self.email,
            position: self.position,
        }
    }
}

/// Insert payload for a new user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique derived username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2id password hash.
    pub password_hash: String,
    /// Role assigned at registration.
    pub position: RoleId,
}

/// Listing projection joining the role name onto the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithRole {
    /// The user entity.
    pub user: User,
    /// Display name of the user's role.
    pub role_name: String,
}

/// Query parameters for user listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserListQuery {
    /// Optional substring filter on id, name, or username.
    pub search: Option<String>,
    /// Maximum rows returned. Non-positive means unlimited.
    pub limit: i64,
    /// Number of rows skipped for offset pagination.
    pub offset: i64,
}

/// Partial update payload for a user row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserUpdate {
    /// Replacement given name.
    pub first_name: Option<String>,
    /// Replacement family name.
    pub last_name: Option<String>,
    /// Replacement email address.
    pub email: Option<String>,
    /// Replacement role assignment.
    pub position: Option<RoleId>,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by their unique username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>>;

    /// Finds a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Returns whether a username is already taken.
    async fn username_exists(&self, username: &str) -> AppResult<bool>;

    /// Creates a new user row. Returns the assigned user id.
    async fn create(&self, new_user: NewUser) -> AppResult<UserId>;

    /// Lists users with their role name joined, excluding accounts
    /// holding the reserved Administrator role.
    async fn list_users(&self, query: UserListQuery) -> AppResult<Vec<UserWithRole>>;

    /// Applies a partial update to a user row.
    async fn update_user(&self, user_id: UserId, update: UserUpdate) -> AppResult<UserRecord>;

    /// Deletes a user row.
    async fn delete_user(&self, user_id: UserId) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps the application layer
/// free of direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Parameters for user registration.
#[derive(Debug, Clone)]
pub struct RegisterParams {
    /// Given name for the new account.
    pub first_name: String,
    /// Family name for the new account.
    pub last_name: String,
    /// Email address for the new account.
    pub email: String,
    /// Plaintext password, validated before hashing.
    pub password: String,
    /// Role assigned at registration.
    pub position: RoleId,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for user registration and authentication.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    role_repository: Arc<dyn RoleRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        role_repository: Arc<dyn RoleRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            user_repository,
            role_repository,
            password_hasher,
        }
    }

    /// Rejects position assignments that do not reference an existing
    /// role; committing one would leave the user pointing at nothing.
    async fn ensure_role_exists(&self, role_id: RoleId) -> AppResult<()> {
        if self.role_repository.find_by_id(role_id).await?.is_none() {
            return Err(AppError::Validation(format!(
                "role '{role_id}' does not exist"
            )));
        }
        Ok(())
    }

    /// Registers a new user.
    ///
    /// The username is derived from the normalized first and last
    /// name; on collision a numeric suffix (`1`, `2`, ...) is appended
    /// until the candidate is free.
    pub async fn register(&self, params: RegisterParams) -> AppResult<User> {
        let first_name = NonEmptyString::new(params.first_name.trim())?;
        let last_name = NonEmptyString::new(params.last_name.trim())?;
        let email = EmailAddress::new(&params.email)?;
        validate_password(&params.password)?;
        self.ensure_role_exists(params.position).await?;

        if self
            .user_repository
            .find_by_email(email.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "email '{}' is already registered",
                email.as_str()
            )));
        }

        let base = derive_username_base(first_name.as_str(), last_name.as_str());
        let mut username = base.clone();
        let mut counter = 1u32;
        while self.user_repository.username_exists(&username).await? {
            username = format!("{base}{counter}");
            counter += 1;
        }

        let password_hash = self.password_hasher.hash_password(&params.password)?;
        let user_id = self
            .user_repository
            .create(NewUser {
                first_name: first_name.as_str().to_owned(),
                last_name: last_name.as_str().to_owned(),
                username: username.clone(),
                email: email.as_str().to_owned(),
                password_hash,
                position: params.position,
            })
            .await?;

        Ok(User {
            id: user_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            username,
            email: email.into(),
            position: params.position,
        })
    }

    /// Verifies a username/password pair.
    ///
    /// Returns a generic unauthorized error for both unknown usernames
    /// and wrong passwords; the hasher runs either way so response
    /// timing does not reveal which case occurred.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let record = self.user_repository.find_by_username(username).await?;

        let Some(record) = record else {
            let _ = self.password_hasher.hash_password(password);
            return Err(AppError::Unauthorized("invalid credentials".to_owned()));
        };

        let password_valid = self
            .password_hasher
            .verify_password(password, &record.password_hash)?;

        if !password_valid {
            return Err(AppError::Unauthorized("invalid credentials".to_owned()));
        }

        Ok(record.into_user())
    }

    /// Returns a user by id.
    pub async fn get_user(&self, user_id: UserId) -> AppResult<User> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .map(UserRecord::into_user)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))
    }

    /// Lists users with role names, excluding Administrator accounts.
    pub async fn list_users(&self, query: UserListQuery) -> AppResult<Vec<UserWithRole>> {
        self.user_repository.list_users(query).await
    }

    /// Applies a partial update to an existing user.
    pub async fn update_user(&self, user_id: UserId, update: UserUpdate) -> AppResult<User> {
        if let Some(ref email) = update.email {
            EmailAddress::new(email)?;
        }
        if let Some(position) = update.position {
            self.ensure_role_exists(position).await?;
        }

        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        let record = self.user_repository.update_user(user_id, update).await?;
        Ok(record.into_user())
    }

    /// Deletes a user.
    pub async fn delete_user(&self, user_id: UserId) -> AppResult<()> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        self.user_repository.delete_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use rolegate_core::{AppError, AppResult, RoleId, UserId};
    use rolegate_domain::Role;

    use crate::role_service::{RoleListQuery, RoleRepository};

    use super::{
        NewUser, PasswordHasher, RegisterParams, UserListQuery, UserRecord, UserRepository,
        UserService, UserUpdate, UserWithRole,
    };

    #[derive(Default)]
    struct FakeUserRepository {
        users: Mutex<Vec<UserRecord>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.username == username)
                .cloned())
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.email == email)
                .cloned())
        }

        async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.id == user_id)
                .cloned())
        }

        async fn username_exists(&self, username: &str) -> AppResult<bool> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .any(|user| user.username == username))
        }

        async fn create(&self, new_user: NewUser) -> AppResult<UserId> {
            let mut users = self.users.lock().await;
            let id = UserId::new(users.len() as i64 + 1);
            users.push(UserRecord {
                id,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
                position: new_user.position,
            });
            Ok(id)
        }

        async fn list_users(&self, _query: UserListQuery) -> AppResult<Vec<UserWithRole>> {
            Ok(Vec::new())
        }

        async fn update_user(
            &self,
            user_id: UserId,
            update: UserUpdate,
        ) -> AppResult<UserRecord> {
            let mut users = self.users.lock().await;
            let user = users
                .iter_mut()
                .find(|user| user.id == user_id)
                .ok_or_else(|| AppError::NotFound("user".to_owned()))?;
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(position) = update.position {
                user.position = position;
            }
            Ok(user.clone())
        }

        async fn delete_user(&self, user_id: UserId) -> AppResult<()> {
            self.users.lock().await.retain(|user| user.id != user_id);
            Ok(())
        }
    }

    /// Fixed role catalog; assignments are validated against it.
    struct FakeRoleRepository {
        roles: Vec<Role>,
    }

    impl FakeRoleRepository {
        fn with_default_role() -> Self {
            Self {
                roles: vec![Role {
                    id: RoleId::new(2),
                    name: "User".to_owned(),
                    slug: "user".to_owned(),
                }],
            }
        }
    }

    #[async_trait]
    impl RoleRepository for FakeRoleRepository {
        async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Role>> {
            Ok(self.roles.iter().find(|role| role.slug == slug).cloned())
        }

        async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
            Ok(self.roles.iter().find(|role| role.id == role_id).cloned())
        }

        async fn list_roles(&self, _query: RoleListQuery) -> AppResult<Vec<Role>> {
            Ok(self.roles.clone())
        }

        async fn create_role(&self, _name: &str, _slug: &str) -> AppResult<Role> {
            Err(AppError::Internal("read-only catalog".to_owned()))
        }

        async fn update_role(
            &self,
            _role_id: RoleId,
            _name: &str,
            _slug: &str,
        ) -> AppResult<Role> {
            Err(AppError::Internal("read-only catalog".to_owned()))
        }

        async fn delete_role_cascade(
            &self,
            _role_id: RoleId,
            _default_role_id: RoleId,
        ) -> AppResult<()> {
            Err(AppError::Internal("read-only catalog".to_owned()))
        }
    }

    /// Reversible stand-in hasher; real hashing is covered by the
    /// infrastructure adapter tests.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    fn service() -> (UserService, Arc<FakeUserRepository>) {
        let repository = Arc::new(FakeUserRepository::default());
        let service = UserService::new(
            repository.clone(),
            Arc::new(FakeRoleRepository::with_default_role()),
            Arc::new(PlainHasher),
        );
        (service, repository)
    }

    fn jane() -> RegisterParams {
        RegisterParams {
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            email: "jane@example.com".to_owned(),
            password: "a-strong-password".to_owned(),
            position: RoleId::new(2),
        }
    }

    #[tokio::test]
    async fn registration_derives_username_from_names() {
        let (service, _) = service();

        let user = service.register(jane()).await;
        assert!(user.is_ok());
        assert_eq!(user.unwrap_or_else(|_| unreachable!()).username, "jane_doe");
    }

    #[tokio::test]
    async fn username_collisions_get_numeric_suffixes() {
        let (service, _) = service();

        let first = service.register(jane()).await;
        assert!(first.is_ok());

        let mut second_params = jane();
        second_params.email = "jane2@example.com".to_owned();
        let second = service.register(second_params).await;
        assert!(second.is_ok());
        assert_eq!(
            second.unwrap_or_else(|_| unreachable!()).username,
            "jane_doe1"
        );

        let mut third_params = jane();
        third_params.email = "jane3@example.com".to_owned();
        let third = service.register(third_params).await;
        assert!(third.is_ok());
        assert_eq!(
            third.unwrap_or_else(|_| unreachable!()).username,
            "jane_doe2"
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (service, _) = service();

        let first = service.register(jane()).await;
        assert!(first.is_ok());

        let second = service.register(jane()).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected_before_any_write() {
        let (service, repository) = service();

        let mut params = jane();
        params.email = "not-an-email".to_owned();
        let result = service.register(params).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repository.users.lock().await.is_empty());
    }

    #[tokio::test]
    async fn authenticate_accepts_correct_credentials() {
        let (service, _) = service();
        let registered = service.register(jane()).await;
        assert!(registered.is_ok());

        let user = service.authenticate("jane_doe", "a-strong-password").await;
        assert!(user.is_ok());
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_password_generically() {
        let (service, _) = service();
        let registered = service.register(jane()).await;
        assert!(registered.is_ok());

        let wrong_password = service.authenticate("jane_doe", "wrong").await;
        assert!(matches!(wrong_password, Err(AppError::Unauthorized(_))));

        let unknown_user = service.authenticate("nobody", "wrong").await;
        assert!(matches!(unknown_user, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn registration_rejects_a_position_without_a_role() {
        let (service, repository) = service();

        let mut params = jane();
        params.position = RoleId::new(999);
        let result = service.register(params).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repository.users.lock().await.is_empty());
    }

    #[tokio::test]
    async fn update_rejects_a_position_without_a_role() {
        let (service, repository) = service();
        let registered = service.register(jane()).await;
        assert!(registered.is_ok());

        let result = service
            .update_user(
                UserId::new(1),
                UserUpdate {
                    position: Some(RoleId::new(999)),
                    ..UserUpdate::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        let users = repository.users.lock().await;
        assert_eq!(users[0].position, RoleId::new(2));
    }

    #[tokio::test]
    async fn update_user_validates_replacement_email() {
        let (service, _) = service();
        let registered = service.register(jane()).await;
        assert!(registered.is_ok());

        let result = service
            .update_user(
                UserId::new(1),
                UserUpdate {
                    email: Some("broken".to_owned()),
                    ..UserUpdate::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
