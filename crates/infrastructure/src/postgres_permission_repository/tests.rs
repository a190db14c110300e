use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use rolegate_application::{RbacQueryRepository, RbacWriteRepository, RoleRepository};
use rolegate_core::AppError;
use rolegate_domain::{GrantPolicy, ResolvedGrant, Role, derive_slug};

use super::PostgresPermissionRepository;
use crate::PostgresRoleRepository;

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
        panic!("failed to run migrations for postgres permission tests: {error}");
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

fn grant(subject: &str, actions: &[&str]) -> ResolvedGrant {
    ResolvedGrant {
        subject_name: subject.to_owned(),
        subject_slug: derive_slug(subject),
        action_names: actions.iter().map(|action| (*action).to_owned()).collect(),
    }
}

async fn create_role(pool: &PgPool, prefix: &str) -> Option<Role> {
    let repository = PostgresRoleRepository::new(pool.clone());
    let name = unique_name(prefix);
    repository.create_role(&name, &derive_slug(&name)).await.ok()
}

#[tokio::test]
async fn lenient_replace_creates_and_resolves_grants() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let Some(role) = create_role(&pool, "Warehouse").await else {
        return;
    };
    let repository = PostgresPermissionRepository::new(pool);

    let subject = unique_name("Stock Item");
    let replaced = repository
        .replace_role_grants(
            role.id,
            vec![grant(&subject, &["create", "read"])],
            GrantPolicy::Lenient,
        )
        .await;
    assert!(replaced.is_ok());

    let grants = repository.grants_for_role(role.id).await;
    assert!(grants.is_ok());
    let grants = grants.unwrap_or_default();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].subject, subject);
    assert_eq!(grants[0].actions, vec!["create", "read"]);
}

#[tokio::test]
async fn strict_replace_rejects_unknown_subjects_and_rolls_back() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let Some(role) = create_role(&pool, "Auditor").await else {
        return;
    };
    let repository = PostgresPermissionRepository::new(pool);

    let known = unique_name("Ledger");
    let seeded = repository
        .replace_role_grants(role.id, vec![grant(&known, &["read"])], GrantPolicy::Lenient)
        .await;
    assert!(seeded.is_ok());

    let unknown = unique_name("Ghost");
    let result = repository
        .replace_role_grants(
            role.id,
            vec![grant(&known, &["create"]), grant(&unknown, &["read"])],
            GrantPolicy::Strict,
        )
        .await;
    assert!(matches!(result, Err(AppError::UnknownCatalogEntry(_))));

    let grants = repository.grants_for_role(role.id).await.unwrap_or_default();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].actions, vec!["read"]);

    let subjects = repository.list_subjects().await.unwrap_or_default();
    assert!(subjects.iter().all(|subject| subject.name != unknown));
}

#[tokio::test]
async fn replace_is_wholesale_and_flat_grants_use_dot_tokens() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let Some(role) = create_role(&pool, "Manager").await else {
        return;
    };
    let repository = PostgresPermissionRepository::new(pool);

    let first_subject = unique_name("Report");
    let replaced = repository
        .replace_role_grants(
            role.id,
            vec![grant(&first_subject, &["read", "update"])],
            GrantPolicy::Lenient,
        )
        .await;
    assert!(replaced.is_ok());

    let second_subject = unique_name("Summary");
    let replaced = repository
        .replace_role_grants(
            role.id,
            vec![grant(&second_subject, &["read"])],
            GrantPolicy::Lenient,
        )
        .await;
    assert!(replaced.is_ok());

    let tokens = repository.flat_grants_for_role(role.id).await;
    assert!(tokens.is_ok());
    assert_eq!(
        tokens.unwrap_or_default(),
        vec![format!("{}.read", derive_slug(&second_subject))]
    );
}

#[tokio::test]
async fn role_without_grants_resolves_to_an_empty_set() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let Some(role) = create_role(&pool, "Idle").await else {
        return;
    };
    let repository = PostgresPermissionRepository::new(pool);

    let grants = repository.grants_for_role(role.id).await;
    assert!(grants.is_ok_and(|grants| grants.is_empty()));
}
