use rolegate_application::{
    AccessTokenService, PermissionResolver, PermissionWriter, RoleService, UserService,
};
use rolegate_core::RoleId;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_service: RoleService,
    pub user_service: UserService,
    pub permission_resolver: PermissionResolver,
    pub permission_writer: PermissionWriter,
    pub access_token_service: AccessTokenService,
    pub default_role_id: RoleId,
}
