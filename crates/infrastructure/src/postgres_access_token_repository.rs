use async_trait::async_trait;
use sqlx::PgPool;

use rolegate_application::AccessTokenRepository;
use rolegate_core::{AppError, AppResult, RoleId, UserId, UserIdentity};

/// PostgreSQL-backed repository for bearer token hashes.
///
/// Lookups join the users table so the identity always reflects the
/// user's current position, not the one held when the token was
/// issued.
#[derive(Clone)]
pub struct PostgresAccessTokenRepository {
    pool: PgPool,
}

impl PostgresAccessTokenRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessTokenRepository for PostgresAccessTokenRepository {
    async fn store_token(&self, identity: &UserIdentity, token_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (user_id, token_hash)
            VALUES ($1, $2)
            "#,
        )
        .bind(identity.user_id().as_i64())
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to store token: {error}")))?;

        Ok(())
    }

    async fn find_identity_by_hash(&self, token_hash: &str) -> AppResult<Option<UserIdentity>> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            r#"
            SELECT users.id, users.username, users.position
            FROM access_tokens
            JOIN users ON users.id = access_tokens.user_id
            WHERE access_tokens.token_hash = $1
              AND access_tokens.revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve token: {error}")))?;

        Ok(row.map(|(user_id, username, position)| {
            UserIdentity::new(UserId::new(user_id), username, RoleId::new(position))
        }))
    }

    async fn revoke_token(&self, token_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE access_tokens
            SET revoked_at = now()
            WHERE token_hash = $1
              AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke token: {error}")))?;

        Ok(())
    }
}
