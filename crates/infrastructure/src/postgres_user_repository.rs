use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use rolegate_application::{NewUser, UserListQuery, UserRecord, UserRepository, UserUpdate, UserWithRole};
use rolegate_core::{AppError, AppResult, RoleId, UserId};
use rolegate_domain::User;

/// PostgreSQL-backed repository for user persistence.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    password_hash: String,
    position: i64,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            position: RoleId::new(row.position),
        }
    }
}

#[derive(Debug, FromRow)]
struct UserWithRoleRow {
    id: i64,
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    position: i64,
    role_name: String,
}

impl From<UserWithRoleRow> for UserWithRole {
    fn from(row: UserWithRoleRow) -> Self {
        Self {
            user: User {
                id: UserId::new(row.id),
                first_name: row.first_name,
                last_name: row.last_name,
                username: row.username,
                email: row.email,
                position: RoleId::new(row.position),
            },
            role_name: row.role_name,
        }
    }
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, username, email, password_hash, position";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to look up user by username: {error}"))
        })?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to look up user by email: {error}"))
        })?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up user by id: {error}")))?;

        Ok(row.map(UserRecord::from))
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check username: {error}")))?;

        Ok(exists)
    }

    async fn create(&self, new_user: NewUser) -> AppResult<UserId> {
        let user_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (first_name, last_name, username, email, password_hash, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.position.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_conflict)?;

        Ok(UserId::new(user_id))
    }

    async fn list_users(&self, query: UserListQuery) -> AppResult<Vec<UserWithRole>> {
        let rows = sqlx::query_as::<_, UserWithRoleRow>(
            r#"
            SELECT
                users.id,
                users.first_name,
                users.last_name,
                users.username,
                users.email,
                users.position,
                user_roles.name AS role_name
            FROM users
            JOIN user_roles ON user_roles.id = users.position
            WHERE user_roles.name <> 'Administrator'
              AND ($1::text IS NULL
                   OR users.first_name ILIKE '%' || $1 || '%'
                   OR users.last_name ILIKE '%' || $1 || '%'
                   OR users.username ILIKE '%' || $1 || '%'
                   OR users.id::text ILIKE '%' || $1 || '%')
            ORDER BY users.id
            LIMIT CASE WHEN $2 > 0 THEN $2 END
            OFFSET $3
            "#,
        )
        .bind(query.search.as_deref())
        .bind(query.limit)
        .bind(query.offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        Ok(rows.into_iter().map(UserWithRole::from).collect())
    }

    async fn update_user(&self, user_id: UserId, update: UserUpdate) -> AppResult<UserRecord> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                position = COALESCE($5, position)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id.as_i64())
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.email.as_deref())
        .bind(update.position.map(|position| position.as_i64()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_conflict)?;

        row.map(UserRecord::from)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))
    }

    async fn delete_user(&self, user_id: UserId) -> AppResult<()> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete user: {error}")))?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }

        Ok(())
    }
}

fn map_user_conflict(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.code().as_deref() == Some("23505") {
            return AppError::Conflict("username or email is already taken".to_owned());
        }
    }
    AppError::Internal(format!("failed to persist user: {error}"))
}
