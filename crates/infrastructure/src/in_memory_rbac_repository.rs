//! In-memory adapter implementing every persistence port over one
//! mutex-guarded state snapshot.
//!
//! Used by tests and by local development without a database. Writes
//! that must be atomic stage their changes on a cloned snapshot and
//! swap it in only on success, mirroring the transaction semantics of
//! the PostgreSQL adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use rolegate_application::{
    AccessTokenRepository, NewUser, RbacQueryRepository, RbacWriteRepository, RoleListQuery,
    RoleRepository, SubjectGrants, UserListQuery, UserRecord, UserRepository, UserUpdate,
    UserWithRole,
};
use rolegate_core::{AppError, AppResult, RoleId, UserId, UserIdentity};
use rolegate_domain::{
    Action, ActionId, FLAG_ACTION_ORDER, GrantPolicy, Permission, PermissionId, RESERVED_ROLE_NAMES,
    ResolvedGrant, Role, Subject, SubjectId, User, derive_slug, is_reserved_role_name,
};

#[derive(Debug, Default, Clone)]
struct StoreState {
    subjects: Vec<Subject>,
    actions: Vec<Action>,
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    grant_edges: Vec<(RoleId, PermissionId)>,
    users: Vec<UserRecord>,
    active_tokens: HashMap<String, UserId>,
    next_id: i64,
    cascade_fault_armed: bool,
}

impl StoreState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn grouped_grants(&self, role_id: RoleId) -> Vec<SubjectGrants> {
        let mut groups: Vec<SubjectGrants> = Vec::new();
        for (edge_role, permission_id) in &self.grant_edges {
            if *edge_role != role_id {
                continue;
            }
            let Some(permission) = self
                .permissions
                .iter()
                .find(|permission| permission.id == *permission_id)
            else {
                continue;
            };
            let Some(subject) = self
                .subjects
                .iter()
                .find(|subject| subject.id == permission.subject_id)
            else {
                continue;
            };
            let Some(action) = self
                .actions
                .iter()
                .find(|action| action.id == permission.action_id)
            else {
                continue;
            };

            match groups
                .iter_mut()
                .find(|group| group.subject == subject.name)
            {
                Some(group) => group.actions.push(action.name.clone()),
                None => groups.push(SubjectGrants {
                    subject: subject.name.clone(),
                    actions: vec![action.name.clone()],
                }),
            }
        }
        groups.sort_by(|left, right| left.subject.cmp(&right.subject));
        groups
    }
}

/// In-memory implementation of the role, grant, user, and token ports.
pub struct InMemoryRbacRepository {
    state: Mutex<StoreState>,
}

impl InMemoryRbacRepository {
    /// Creates a store seeded like a freshly migrated database: the
    /// reserved roles and the positional action catalog.
    #[must_use]
    pub fn new() -> Self {
        let mut state = StoreState::default();

        for name in RESERVED_ROLE_NAMES {
            let id = state.allocate_id();
            state.roles.push(Role {
                id: RoleId::new(id),
                name: (*name).to_owned(),
                slug: derive_slug(name),
            });
        }

        for name in FLAG_ACTION_ORDER {
            let id = state.allocate_id();
            state.actions.push(Action {
                id: ActionId::new(id),
                name: (*name).to_owned(),
            });
        }

        Self {
            state: Mutex::new(state),
        }
    }

    /// Adds a subject to the catalog and returns it.
    pub async fn seed_subject(&self, name: &str) -> Subject {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let subject = Subject {
            id: SubjectId::new(id),
            name: name.to_owned(),
            slug: derive_slug(name),
        };
        state.subjects.push(subject.clone());
        subject
    }

    /// Adds a role and returns it.
    pub async fn seed_role(&self, name: &str) -> Role {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let role = Role {
            id: RoleId::new(id),
            name: name.to_owned(),
            slug: derive_slug(name),
        };
        state.roles.push(role.clone());
        role
    }

    /// Adds a user holding the given position and returns its record.
    pub async fn seed_user(&self, username: &str, position: RoleId) -> UserRecord {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let record = UserRecord {
            id: UserId::new(id),
            first_name: username.to_owned(),
            last_name: "test".to_owned(),
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password_hash: String::new(),
            position,
        };
        state.users.push(record.clone());
        record
    }

    /// Returns the number of permission pairs in the catalog.
    pub async fn permission_pair_count(&self) -> usize {
        self.state.lock().await.permissions.len()
    }

    /// Arms a one-shot fault that aborts the next delete cascade after
    /// its user-reassignment step, before anything is committed.
    pub async fn arm_cascade_fault(&self) {
        self.state.lock().await.cascade_fault_armed = true;
    }
}

impl Default for InMemoryRbacRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRbacRepository {
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Role>> {
        let state = self.state.lock().await;
        Ok(state.roles.iter().find(|role| role.slug == slug).cloned())
    }

    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let state = self.state.lock().await;
        Ok(state.roles.iter().find(|role| role.id == role_id).cloned())
    }

    async fn list_roles(&self, query: RoleListQuery) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut roles: Vec<Role> = state
            .roles
            .iter()
            .filter(|role| !is_reserved_role_name(&role.name))
            .filter(|role| {
                needle.as_deref().is_none_or(|needle| {
                    role.name.to_lowercase().contains(needle)
                        || role.slug.contains(needle)
                        || role.id.to_string().contains(needle)
                })
            })
            .cloned()
            .collect();
        roles.sort_by(|left, right| left.name.cmp(&right.name));

        let offset = usize::try_from(query.offset.max(0)).unwrap_or(usize::MAX);
        let roles = roles.into_iter().skip(offset);
        if query.limit > 0 {
            let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
            Ok(roles.take(limit).collect())
        } else {
            Ok(roles.collect())
        }
    }

    async fn create_role(&self, name: &str, slug: &str) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        if state
            .roles
            .iter()
            .any(|role| role.name == name || role.slug == slug)
        {
            return Err(AppError::Conflict(format!("role '{name}' already exists")));
        }

        let id = state.allocate_id();
        let role = Role {
            id: RoleId::new(id),
            name: name.to_owned(),
            slug: slug.to_owned(),
        };
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, role_id: RoleId, name: &str, slug: &str) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        if state
            .roles
            .iter()
            .any(|role| role.id != role_id && (role.name == name || role.slug == slug))
        {
            return Err(AppError::Conflict(format!("role '{name}' already exists")));
        }

        let role = state
            .roles
            .iter_mut()
            .find(|role| role.id == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        role.name = name.to_owned();
        role.slug = slug.to_owned();
        Ok(role.clone())
    }

    async fn delete_role_cascade(
        &self,
        role_id: RoleId,
        default_role_id: RoleId,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;

        // Staged like the SQL adapter's transaction: the live state
        // only changes once every cascade step has succeeded.
        let mut staged = state.clone();

        let before = staged.roles.len();
        staged.roles.retain(|role| role.id != role_id);
        if staged.roles.len() == before {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' was already deleted"
            )));
        }

        for user in &mut staged.users {
            if user.position == role_id {
                user.position = default_role_id;
            }
        }

        if state.cascade_fault_armed {
            state.cascade_fault_armed = false;
            return Err(AppError::TransactionFailure(
                "delete cascade aborted".to_owned(),
            ));
        }

        staged.grant_edges.retain(|(edge_role, _)| *edge_role != role_id);
        *state = staged;
        Ok(())
    }
}

#[async_trait]
impl RbacQueryRepository for InMemoryRbacRepository {
    async fn grants_for_role(&self, role_id: RoleId) -> AppResult<Vec<SubjectGrants>> {
        let state = self.state.lock().await;
        Ok(state.grouped_grants(role_id))
    }

    async fn grants_for_user(&self, user_id: UserId) -> AppResult<Vec<SubjectGrants>> {
        let state = self.state.lock().await;
        let Some(user) = state.users.iter().find(|user| user.id == user_id) else {
            return Ok(Vec::new());
        };
        Ok(state.grouped_grants(user.position))
    }

    async fn flat_grants_for_role(&self, role_id: RoleId) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut tokens = Vec::new();
        for (edge_role, permission_id) in &state.grant_edges {
            if *edge_role != role_id {
                continue;
            }
            let Some(permission) = state
                .permissions
                .iter()
                .find(|permission| permission.id == *permission_id)
            else {
                continue;
            };
            let Some(subject) = state
                .subjects
                .iter()
                .find(|subject| subject.id == permission.subject_id)
            else {
                continue;
            };
            let Some(action) = state
                .actions
                .iter()
                .find(|action| action.id == permission.action_id)
            else {
                continue;
            };
            tokens.push(format!("{}.{}", subject.slug, action.name));
        }
        Ok(tokens)
    }

    async fn permission_catalog(&self) -> AppResult<Vec<SubjectGrants>> {
        let state = self.state.lock().await;
        let mut groups: Vec<SubjectGrants> = Vec::new();
        for permission in &state.permissions {
            let Some(subject) = state
                .subjects
                .iter()
                .find(|subject| subject.id == permission.subject_id)
            else {
                continue;
            };
            let Some(action) = state
                .actions
                .iter()
                .find(|action| action.id == permission.action_id)
            else {
                continue;
            };

            match groups
                .iter_mut()
                .find(|group| group.subject == subject.name)
            {
                Some(group) => group.actions.push(action.name.clone()),
                None => groups.push(SubjectGrants {
                    subject: subject.name.clone(),
                    actions: vec![action.name.clone()],
                }),
            }
        }
        groups.sort_by(|left, right| left.subject.cmp(&right.subject));
        Ok(groups)
    }

    async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        let state = self.state.lock().await;
        let mut subjects = state.subjects.clone();
        subjects.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(subjects)
    }
}

#[async_trait]
impl RbacWriteRepository for InMemoryRbacRepository {
    async fn replace_role_grants(
        &self,
        role_id: RoleId,
        grants: Vec<ResolvedGrant>,
        policy: GrantPolicy,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;

        // Stage everything on a copy; an early return leaves the live
        // state exactly as it was.
        let mut staged = state.clone();
        staged.grant_edges.retain(|(edge_role, _)| *edge_role != role_id);

        for grant in &grants {
            let subject_id = match staged
                .subjects
                .iter()
                .find(|subject| subject.name == grant.subject_name)
            {
                Some(subject) => subject.id,
                None => match policy {
                    GrantPolicy::Strict => {
                        return Err(AppError::UnknownCatalogEntry(format!(
                            "subject '{}'",
                            grant.subject_name
                        )));
                    }
                    GrantPolicy::Lenient => {
                        let id = SubjectId::new(staged.allocate_id());
                        staged.subjects.push(Subject {
                            id,
                            name: grant.subject_name.clone(),
                            slug: grant.subject_slug.clone(),
                        });
                        id
                    }
                },
            };

            for action_name in &grant.action_names {
                let action_id = match staged
                    .actions
                    .iter()
                    .find(|action| &action.name == action_name)
                {
                    Some(action) => action.id,
                    None => match policy {
                        GrantPolicy::Strict => {
                            return Err(AppError::UnknownCatalogEntry(format!(
                                "action '{action_name}'"
                            )));
                        }
                        GrantPolicy::Lenient => {
                            let id = ActionId::new(staged.allocate_id());
                            staged.actions.push(Action {
                                id,
                                name: action_name.clone(),
                            });
                            id
                        }
                    },
                };

                let permission_id = match staged.permissions.iter().find(|permission| {
                    permission.subject_id == subject_id && permission.action_id == action_id
                }) {
                    Some(permission) => permission.id,
                    None => {
                        let id = PermissionId::new(staged.allocate_id());
                        staged.permissions.push(Permission {
                            id,
                            subject_id,
                            action_id,
                        });
                        id
                    }
                };

                if !staged.grant_edges.contains(&(role_id, permission_id)) {
                    staged.grant_edges.push((role_id, permission_id));
                }
            }
        }

        *state = staged;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRbacRepository {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let state = self.state.lock().await;
        let needle = email.to_lowercase();
        Ok(state
            .users
            .iter()
            .find(|user| user.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.id == user_id).cloned())
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.users.iter().any(|user| user.username == username))
    }

    async fn create(&self, new_user: NewUser) -> AppResult<UserId> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|user| {
            user.username == new_user.username
                || user.email.to_lowercase() == new_user.email.to_lowercase()
        }) {
            return Err(AppError::Conflict(
                "username or email is already taken".to_owned(),
            ));
        }

        let id = UserId::new(state.allocate_id());
        state.users.push(UserRecord {
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

    async fn list_users(&self, query: UserListQuery) -> AppResult<Vec<UserWithRole>> {
        let state = self.state.lock().await;
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut listed = Vec::new();
        for user in &state.users {
            let Some(role) = state.roles.iter().find(|role| role.id == user.position) else {
                continue;
            };
            if role.name == "Administrator" {
                continue;
            }
            let matches = needle.as_deref().is_none_or(|needle| {
                user.first_name.to_lowercase().contains(needle)
                    || user.last_name.to_lowercase().contains(needle)
                    || user.username.contains(needle)
                    || user.id.to_string().contains(needle)
            });
            if !matches {
                continue;
            }
            listed.push(UserWithRole {
                user: User {
                    id: user.id,
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    username: user.username.clone(),
                    email: user.email.clone(),
                    position: user.position,
                },
                role_name: role.name.clone(),
            });
        }

        let offset = usize::try_from(query.offset.max(0)).unwrap_or(usize::MAX);
        let listed = listed.into_iter().skip(offset);
        if query.limit > 0 {
            let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
            Ok(listed.take(limit).collect())
        } else {
            Ok(listed.collect())
        }
    }

    async fn update_user(&self, user_id: UserId, update: UserUpdate) -> AppResult<UserRecord> {
        let mut state = self.state.lock().await;

        if let Some(ref email) = update.email {
            let needle = email.to_lowercase();
            if state
                .users
                .iter()
                .any(|user| user.id != user_id && user.email.to_lowercase() == needle)
            {
                return Err(AppError::Conflict(format!(
                    "email '{email}' is already registered"
                )));
            }
        }

        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(position) = update.position {
            user.position = position;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: UserId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let before = state.users.len();
        state.users.retain(|user| user.id != user_id);
        if state.users.len() == before {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl AccessTokenRepository for InMemoryRbacRepository {
    async fn store_token(&self, identity: &UserIdentity, token_hash: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .active_tokens
            .insert(token_hash.to_owned(), identity.user_id());
        Ok(())
    }

    async fn find_identity_by_hash(&self, token_hash: &str) -> AppResult<Option<UserIdentity>> {
        let state = self.state.lock().await;
        let Some(user_id) = state.active_tokens.get(token_hash) else {
            return Ok(None);
        };
        Ok(state
            .users
            .iter()
            .find(|user| user.id == *user_id)
            .map(|user| UserIdentity::new(user.id, user.username.clone(), user.position)))
    }

    async fn revoke_token(&self, token_hash: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.active_tokens.remove(token_hash);
        Ok(())
    }
}
