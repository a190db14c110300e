use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use rolegate_application::{RoleListQuery, RoleRepository};
use rolegate_core::{AppError, RoleId};
use rolegate_domain::derive_slug;

use super::PostgresRoleRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres role tests: {error}");
    }

    Some(pool)
}

fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("{prefix} {nanos}")
}

#[tokio::test]
async fn created_role_is_found_by_slug() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);

    let name = unique_name("Cashier");
    let slug = derive_slug(&name);

    let created = repository.create_role(&name, &slug).await;
    assert!(created.is_ok());

    let found = repository.find_by_slug(&slug).await;
    assert!(found.is_ok());
    let found = found.unwrap_or_default();
    assert!(found.is_some_and(|role| role.name == name));
}

#[tokio::test]
async fn duplicate_role_name_is_a_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);

    let name = unique_name("Clerk");
    let slug = derive_slug(&name);

    let first = repository.create_role(&name, &slug).await;
    assert!(first.is_ok());

    let second = repository.create_role(&name, &slug).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn listing_excludes_reserved_roles() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);

    let roles = repository.list_roles(RoleListQuery::default()).await;
    assert!(roles.is_ok());
    let roles = roles.unwrap_or_default();
    assert!(roles
        .iter()
        .all(|role| role.name != "Administrator" && role.name != "User"));
}

#[tokio::test]
async fn delete_cascade_reassigns_users_and_drops_edges() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool.clone());

    let name = unique_name("Stock Keeper");
    let created = repository.create_role(&name, &derive_slug(&name)).await;
    assert!(created.is_ok());
    let Ok(role) = created else {
        return;
    };

    let username = derive_slug(&unique_name("stockuser"));
    let user_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (first_name, last_name, username, email, password_hash, position)
        VALUES ('Stock', 'User', $1, $1 || '@example.com', 'x', $2)
        RETURNING id
        "#,
    )
    .bind(&username)
    .bind(role.id.as_i64())
    .fetch_one(&pool)
    .await;
    assert!(user_id.is_ok());

    let deleted = repository.delete_role_cascade(role.id, RoleId::new(2)).await;
    assert!(deleted.is_ok());

    let position = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT position FROM users WHERE username = $1
        "#,
    )
    .bind(&username)
    .fetch_one(&pool)
    .await;
    assert!(position.is_ok_and(|position| position == 2));

    let gone = repository.find_by_id(role.id).await;
    assert!(gone.is_ok_and(|role| role.is_none()));
}

#[tokio::test]
async fn deleting_a_missing_role_is_a_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);

    let result = repository
        .delete_role_cascade(RoleId::new(i64::MAX - 1), RoleId::new(2))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}
