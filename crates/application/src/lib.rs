//! Application services and ports for the Rolegate RBAC backend.

#![forbid(unsafe_code)]

mod access_token_service;
mod permission_ports;
mod permission_resolver;
mod permission_writer;
mod role_service;
mod user_service;

pub use access_token_service::{AccessTokenRepository, AccessTokenService};
pub use permission_ports::{
    RbacQueryRepository, RbacWriteRepository, RolePermissionSummary, SubjectGrants,
};
pub use permission_resolver::PermissionResolver;
pub use permission_writer::PermissionWriter;
pub use role_service::{RoleListQuery, RoleRepository, RoleService};
pub use user_service::{
    NewUser, PasswordHasher, RegisterParams, UserListQuery, UserRecord, UserRepository,
    UserService, UserUpdate, UserWithRole,
};
