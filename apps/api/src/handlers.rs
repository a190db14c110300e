use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;

use rolegate_application::{RegisterParams, RoleListQuery, UserListQuery, UserUpdate};
use rolegate_core::{RoleId, UserId, UserIdentity};
use rolegate_domain::GrantPolicy;

use crate::dto::{
    CreateRoleRequest, HealthResponse, ListQuery, LoginRequest, LoginResponse, RegisterRequest,
    ReplacePermissionsRequest, RolePermissionSummaryResponse, RoleResponse, SubjectGrantsResponse,
    SubjectResponse, UpdateRoleRequest, UpdateUserRequest, UserResponse, UserWithRoleResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod auth;
mod health;
mod permissions;
mod roles;
mod users;

pub use auth::{login_handler, logout_handler, my_permissions_handler, register_handler};
pub use health::health_handler;
pub use permissions::{
    permission_catalog_handler, replace_flag_permissions_handler,
    replace_named_permissions_handler, role_grants_handler, role_permissions_by_slug_handler,
    subjects_handler, user_grants_handler,
};
pub use roles::{
    create_role_handler, delete_role_handler, get_role_handler, list_roles_handler,
    update_role_handler,
};
pub use users::{delete_user_handler, get_user_handler, list_users_handler, update_user_handler};
