//! Shared primitives for all Rust crates in Rolegate.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::{RoleId, UserId, UserIdentity};

/// Result type used across Rolegate crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// Multi-step writers roll back their whole transaction on any error.
/// Read-side resolvers never use `NotFound` for an empty grant set --
/// absence of grants is a valid state, not a failure.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant. No mutation was attempted.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A strict-mode grant declaration named a subject or action that
    /// is not in the catalog.
    #[error("unknown catalog entry: {0}")]
    UnknownCatalogEntry(String),

    /// The underlying store aborted mid-operation; all writes of the
    /// failed call were rolled back.
    #[error("transaction failure: {0}")]
    TransactionFailure(String),

    /// Caller is not authenticated or presented invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn non_empty_string_keeps_value() {
        let result = NonEmptyString::new("Purchase Order");
        assert!(result.is_ok());
        assert_eq!(
            result.unwrap_or_else(|_| unreachable!()).as_str(),
            "Purchase Order"
        );
    }

    #[test]
    fn error_messages_carry_category_prefix() {
        let error = AppError::UnknownCatalogEntry("subject 'Ledger'".to_owned());
        assert_eq!(error.to_string(), "unknown catalog entry: subject 'Ledger'");
    }
}
