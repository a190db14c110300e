//! Domain entities and pure rules for the Rolegate RBAC model.

#![forbid(unsafe_code)]

/// Subject, action, and permission catalog types.
pub mod catalog;
/// Grant declaration shapes submitted by administrators.
pub mod grants;
/// Role ("position") types and reserved-role rules.
pub mod role;
/// User types, validation, and username derivation.
pub mod user;

pub use catalog::{Action, ActionId, Permission, PermissionId, Subject, SubjectId, derive_slug};
pub use grants::{ActionSet, FLAG_ACTION_ORDER, GrantDeclaration, GrantPolicy, ResolvedGrant};
pub use role::{RESERVED_ROLE_NAMES, Role, is_reserved_role_name};
pub use user::{EmailAddress, User, derive_username_base, validate_password};
