//! Rolegate API composition root.

#![forbid(unsafe_code)]

mod config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use rolegate_application::{
    AccessTokenService, PermissionResolver, PermissionWriter, RoleService, UserService,
};
use rolegate_core::AppError;
use rolegate_infrastructure::{
    Argon2PasswordHasher, PostgresAccessTokenRepository, PostgresPermissionRepository,
    PostgresRoleRepository, PostgresUserRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ApiConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
    let config = ApiConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let permission_repository = Arc::new(PostgresPermissionRepository::new(pool.clone()));
    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let token_repository = Arc::new(PostgresAccessTokenRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());

    let app_state = AppState {
        role_service: RoleService::new(role_repository.clone(), config.default_role_id),
        user_service: UserService::new(user_repository, role_repository.clone(), password_hasher),
        permission_resolver: PermissionResolver::new(
            permission_repository.clone(),
            role_repository.clone(),
        ),
        permission_writer: PermissionWriter::new(permission_repository, role_repository),
        access_token_service: AccessTokenService::new(token_repository),
        default_role_id: config.default_role_id,
    };

    let protected_routes = Router::new()
        .route("/api/logout", post(handlers::logout_handler))
        .route(
            "/api/me/permissions",
            get(handlers::my_permissions_handler),
        )
        .route(
            "/api/roles",
            get(handlers::list_roles_handler).post(handlers::create_role_handler),
        )
        .route(
            "/api/roles/{id}",
            get(handlers::get_role_handler)
                .put(handlers::update_role_handler)
                .delete(handlers::delete_role_handler),
        )
        .route(
            "/api/roles/{id}/permissions",
            get(handlers::role_grants_handler),
        )
        .route(
            "/api/role-permissions/{slug}",
            get(handlers::role_permissions_by_slug_handler)
                .put(handlers::replace_named_permissions_handler),
        )
        .route(
            "/api/role-permission-flags/{slug}",
            put(handlers::replace_flag_permissions_handler),
        )
        .route(
            "/api/permissions",
            get(handlers::permission_catalog_handler),
        )
        .route("/api/subjects", get(handlers::subjects_handler))
        .route("/api/users", get(handlers::list_users_handler))
        .route(
            "/api/users/{id}",
            get(handlers::get_user_handler)
                .put(handlers::update_user_handler)
                .delete(handlers::delete_user_handler),
        )
        .route(
            "/api/users/{id}/permissions",
            get(handlers::user_grants_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&config.frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/register", post(handlers::register_handler))
        .route("/api/login", post(handlers::login_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&config.api_host).map_err(|error| {
        AppError::Internal(format!("invalid API_HOST '{}': {error}", config.api_host))
    })?;
    let address = SocketAddr::from((host, config.api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "rolegate-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
