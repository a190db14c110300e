//! User domain types and validation rules.

use rolegate_core::{AppError, AppResult, RoleId, UserId};
use serde::{Deserialize, Serialize};

/// A registered account holding a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier.
    pub id: UserId,
    /// Given name as entered at registration.
    pub first_name: String,
    /// Family name as entered at registration.
    pub last_name: String,
    /// Unique derived username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Role held by the user. Always references an existing role at
    /// any committed state.
    pub position: RoleId,
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly
    /// one `@`, local part and domain are non-empty, domain contains at
    /// least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum accepted password length.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Maximum accepted password length (protects the hasher from
/// oversized input).
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password against length bounds.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Derives the base username for a first/last name pair: each part
/// lowercased with whitespace removed, joined with an underscore.
///
/// Uniqueness disambiguation (the `1`, `2`, ... suffix) is handled by
/// the registration flow against the user store.
#[must_use]
pub fn derive_username_base(first_name: &str, last_name: &str) -> String {
    let normalize = |part: &str| {
        part.chars()
            .filter(|character| !character.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };

    format!("{}_{}", normalize(first_name), normalize(last_name))
}
