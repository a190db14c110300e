//! PostgreSQL adapter for the grant query and write ports.
//!
//! The write side runs the whole-set replace as one transaction: the
//! role's edges are cleared, the subject and action catalogs are
//! preloaded into maps, each declared pair is resolved under the
//! caller's policy, and everything commits or nothing does.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use rolegate_application::{RbacQueryRepository, RbacWriteRepository, SubjectGrants};
use rolegate_core::{AppError, AppResult, RoleId, UserId};
use rolegate_domain::{GrantPolicy, ResolvedGrant, Subject, SubjectId};

/// PostgreSQL-backed repository for permission grants.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GrantRow {
    subject_name: String,
    action_name: String,
}

#[derive(Debug, FromRow)]
struct SubjectRow {
    id: i64,
    name: String,
    slug: String,
}

/// Folds `(subject, action)` rows, pre-sorted by subject, into grouped
/// per-subject action lists.
fn group_by_subject(rows: Vec<GrantRow>) -> Vec<SubjectGrants> {
    let mut groups: Vec<SubjectGrants> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some(group) if group.subject == row.subject_name => {
                group.actions.push(row.action_name);
            }
            _ => groups.push(SubjectGrants {
                subject: row.subject_name,
                actions: vec![row.action_name],
            }),
        }
    }
    groups
}

#[async_trait]
impl RbacQueryRepository for PostgresPermissionRepository {
    async fn grants_for_role(&self, role_id: RoleId) -> AppResult<Vec<SubjectGrants>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT subjects.name AS subject_name, actions.name AS action_name
            FROM role_permissions
            JOIN permissions ON permissions.id = role_permissions.permission_id
            JOIN subjects ON subjects.id = permissions.subject_id
            JOIN actions ON actions.id = permissions.action_id
            WHERE role_permissions.role_id = $1
            ORDER BY subjects.name, role_permissions.id
            "#,
        )
        .bind(role_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role grants: {error}")))?;

        Ok(group_by_subject(rows))
    }

    async fn grants_for_user(&self, user_id: UserId) -> AppResult<Vec<SubjectGrants>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT subjects.name AS subject_name, actions.name AS action_name
            FROM users
            JOIN role_permissions ON role_permissions.role_id = users.position
            JOIN permissions ON permissions.id = role_permissions.permission_id
            JOIN subjects ON subjects.id = permissions.subject_id
            JOIN actions ON actions.id = permissions.action_id
            WHERE users.id = $1
            ORDER BY subjects.name, role_permissions.id
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user grants: {error}")))?;

        Ok(group_by_subject(rows))
    }

    async fn flat_grants_for_role(&self, role_id: RoleId) -> AppResult<Vec<String>> {
        let tokens = sqlx::query_scalar::<_, String>(
            r#"
            SELECT subjects.slug || '.' || actions.name
            FROM role_permissions
            JOIN permissions ON permissions.id = role_permissions.permission_id
            JOIN subjects ON subjects.id = permissions.subject_id
            JOIN actions ON actions.id = permissions.action_id
            WHERE role_permissions.role_id = $1
            ORDER BY role_permissions.id
            "#,
        )
        .bind(role_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load flat grants: {error}")))?;

        Ok(tokens)
    }

    async fn permission_catalog(&self) -> AppResult<Vec<SubjectGrants>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT subjects.name AS subject_name, actions.name AS action_name
            FROM permissions
            JOIN subjects ON subjects.id = permissions.subject_id
            JOIN actions ON actions.id = permissions.action_id
            ORDER BY subjects.name, permissions.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load permission catalog: {error}"))
        })?;

        Ok(group_by_subject(rows))
    }

    async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        let rows = sqlx::query_as::<_, SubjectRow>(
            r#"
            SELECT id, name, slug
            FROM subjects
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list subjects: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| Subject {
                id: SubjectId::new(row.id),
                name: row.name,
                slug: row.slug,
            })
            .collect())
    }
}

#[async_trait]
impl RbacWriteRepository for PostgresPermissionRepository {
    async fn replace_role_grants(
        &self,
        role_id: RoleId,
        grants: Vec<ResolvedGrant>,
        policy: GrantPolicy,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::TransactionFailure(format!("failed to begin transaction: {error}"))
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
            AppError::TransactionFailure(format!("failed to clear role grants: {error}"))
        })?;

        let mut subject_ids =
            load_name_index(&mut transaction, "SELECT name, id FROM subjects").await?;
        let mut action_ids =
            load_name_index(&mut transaction, "SELECT name, id FROM actions").await?;

        for grant in &grants {
            let subject_id = match subject_ids.get(grant.subject_name.as_str()) {
                Some(id) => *id,
                None => match policy {
                    GrantPolicy::Strict => {
                        return Err(AppError::UnknownCatalogEntry(format!(
                            "subject '{}'",
                            grant.subject_name
                        )));
                    }
                    GrantPolicy::Lenient => {
                        let id = sqlx::query_scalar::<_, i64>(
                            r#"
                            INSERT INTO subjects (name, slug)
                            VALUES ($1, $2)
                            RETURNING id
                            "#,
                        )
                        .bind(&grant.subject_name)
                        .bind(&grant.subject_slug)
                        .fetch_one(&mut *transaction)
                        .await
                        .map_err(|error| {
                            map_catalog_insert_error(error, "subject", &grant.subject_name)
                        })?;
                        subject_ids.insert(grant.subject_name.clone(), id);
                        id
                    }
                },
            };

            for action_name in &grant.action_names {
                let action_id = match action_ids.get(action_name.as_str()) {
                    Some(id) => *id,
                    None => match policy {
                        GrantPolicy::Strict => {
                            return Err(AppError::UnknownCatalogEntry(format!(
                                "action '{action_name}'"
                            )));
                        }
                        GrantPolicy::Lenient => {
                            let id = sqlx::query_scalar::<_, i64>(
                                r#"
                                INSERT INTO actions (name)
                                VALUES ($1)
                                RETURNING id
                                "#,
                            )
                            .bind(action_name)
                            .fetch_one(&mut *transaction)
                            .await
                            .map_err(|error| {
                                map_catalog_insert_error(error, "action", action_name)
                            })?;
                            action_ids.insert(action_name.clone(), id);
                            id
                        }
                    },
                };

                let permission_id =
                    find_or_create_permission(&mut transaction, subject_id, action_id).await?;

                sqlx::query(
                    r#"
                    INSERT INTO role_permissions (role_id, permission_id)
                    VALUES ($1, $2)
                    ON CONFLICT (role_id, permission_id) DO NOTHING
                    "#,
                )
                .bind(role_id.as_i64())
                .bind(permission_id)
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::TransactionFailure(format!(
                        "failed to insert grant edge: {error}"
                    ))
                })?;
            }
        }

        transaction.commit().await.map_err(|error| {
            AppError::TransactionFailure(format!("failed to commit transaction: {error}"))
        })?;

        tracing::debug!(
            role_id = %role_id,
            grants = grants.len(),
            "role grant set replaced"
        );
        Ok(())
    }
}

/// Loads a `name -> id` index from a two-column catalog query.
async fn load_name_index(
    transaction: &mut Transaction<'_, Postgres>,
    query: &str,
) -> AppResult<HashMap<String, i64>> {
    let rows = sqlx::query_as::<_, (String, i64)>(query)
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::TransactionFailure(format!("failed to preload catalog: {error}"))
        })?;

    Ok(rows.into_iter().collect())
}

/// Returns the permission id for a `(subject, action)` pair, creating
/// the row on first use.
async fn find_or_create_permission(
    transaction: &mut Transaction<'_, Postgres>,
    subject_id: i64,
    action_id: i64,
) -> AppResult<i64> {
    let existing = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id
        FROM permissions
        WHERE subject_id = $1 AND action_id = $2
        "#,
    )
    .bind(subject_id)
    .bind(action_id)
    .fetch_optional(&mut **transaction)
    .await
    .map_err(|error| {
        AppError::TransactionFailure(format!("failed to look up permission: {error}"))
    })?;

    if let Some(id) = existing {
        return Ok(id);
    }

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO permissions (subject_id, action_id)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(subject_id)
    .bind(action_id)
    .fetch_one(&mut **transaction)
    .await
    .map_err(|error| map_catalog_insert_error(error, "permission", "pair"))
}

/// Maps a lenient-mode catalog insert failure. A unique violation here
/// means a concurrent writer inserted the same name between our
/// preload and insert; the call is rolled back and can be retried.
fn map_catalog_insert_error(error: sqlx::Error, kind: &str, name: &str) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.code().as_deref() == Some("23505") {
            return AppError::TransactionFailure(format!(
                "concurrent insert of {kind} '{name}'"
            ));
        }
    }
    AppError::TransactionFailure(format!("failed to insert {kind} '{name}': {error}"))
}

#[cfg(test)]
mod tests;
