use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use rolegate_application::{RoleListQuery, RoleRepository};
use rolegate_core::{AppError, AppResult, RoleId};
use rolegate_domain::{RESERVED_ROLE_NAMES, Role};

/// PostgreSQL-backed repository for role persistence.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    slug: String,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::new(row.id),
            name: row.name,
            slug: row.slug,
        }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, slug
            FROM user_roles
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up role by slug: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, slug
            FROM user_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up role by id: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn list_roles(&self, query: RoleListQuery) -> AppResult<Vec<Role>> {
        let reserved: Vec<String> = RESERVED_ROLE_NAMES
            .iter()
            .map(|name| (*name).to_owned())
            .collect();

        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, slug
            FROM user_roles
            WHERE name <> ALL($1)
              AND ($2::text IS NULL
                   OR name ILIKE '%' || $2 || '%'
                   OR slug ILIKE '%' || $2 || '%'
                   OR id::text ILIKE '%' || $2 || '%')
            ORDER BY name
            LIMIT CASE WHEN $3 > 0 THEN $3 END
            OFFSET $4
            "#,
        )
        .bind(&reserved)
        .bind(query.search.as_deref())
        .bind(query.limit)
        .bind(query.offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn create_role(&self, name: &str, slug: &str) -> AppResult<Role> {
        let role_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_roles (name, slug)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_role_conflict(error, name))?;

        Ok(Role {
            id: RoleId::new(role_id),
            name: name.to_owned(),
            slug: slug.to_owned(),
        })
    }

    async fn update_role(&self, role_id: RoleId, name: &str, slug: &str) -> AppResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            UPDATE user_roles
            SET name = $2, slug = $3
            WHERE id = $1
            RETURNING id, name, slug
            "#,
        )
        .bind(role_id.as_i64())
        .bind(name)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_role_conflict(error, name))?;

        row.map(Role::from)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn delete_role_cascade(
        &self,
        role_id: RoleId,
        default_role_id: RoleId,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::TransactionFailure(format!("failed to begin transaction: {error}"))
        })?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM user_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_i64())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::TransactionFailure(format!("failed to delete role: {error}"))
        })?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' was already deleted"
            )));
        }

        sqlx::query(
            r#"
            UPDATE users
            SET position = $2
            WHERE position = $1
            "#,
        )
        .bind(role_id.as_i64())
        .bind(default_role_id.as_i64())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::TransactionFailure(format!("failed to reassign displaced users: {error}"))
        })?;

        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_i64())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::TransactionFailure(format!("failed to delete role grants: {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::TransactionFailure(format!("failed to commit transaction: {error}"))
        })?;

        tracing::debug!(role_id = %role_id, "role delete cascade committed");
        Ok(())
    }
}

fn map_role_conflict(error: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.code().as_deref() == Some("23505") {
            return AppError::Conflict(format!("role '{name}' already exists"));
        }
    }
    AppError::Internal(format!("failed to persist role: {error}"))
}

#[cfg(test)]
mod tests;
