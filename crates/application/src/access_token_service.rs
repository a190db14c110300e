//! Opaque bearer token issuance and verification.
//!
//! Tokens are 32 random bytes rendered as hex; only the SHA-256 hash
//! is persisted, so a leaked token store does not leak usable tokens.

use std::sync::Arc;

use async_trait::async_trait;

use rolegate_core::{AppError, AppResult, UserIdentity};

/// Repository port for bearer token persistence.
#[async_trait]
pub trait AccessTokenRepository: Send + Sync {
    /// Stores a token hash for the identified user.
    async fn store_token(&self, identity: &UserIdentity, token_hash: &str) -> AppResult<()>;

    /// Resolves a token hash into the identity it was issued for.
    /// Revoked and unknown hashes resolve to `None`.
    async fn find_identity_by_hash(&self, token_hash: &str) -> AppResult<Option<UserIdentity>>;

    /// Revokes the token with the given hash. Revoking an unknown
    /// hash is a no-op.
    async fn revoke_token(&self, token_hash: &str) -> AppResult<()>;
}

/// Application service issuing and checking opaque bearer tokens.
#[derive(Clone)]
pub struct AccessTokenService {
    repository: Arc<dyn AccessTokenRepository>,
}

impl AccessTokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessTokenRepository>) -> Self {
        Self { repository }
    }

    /// Issues a fresh token for the identity and returns the raw
    /// value. The raw token is never stored and cannot be recovered.
    pub async fn issue(&self, identity: &UserIdentity) -> AppResult<String> {
        let (raw_token, token_hash) = generate_token()?;
        self.repository.store_token(identity, &token_hash).await?;
        Ok(raw_token)
    }

    /// Resolves a presented raw token into the identity it carries.
    pub async fn authenticate(&self, raw_token: &str) -> AppResult<UserIdentity> {
        self.repository
            .find_identity_by_hash(&hash_token(raw_token))
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid or revoked token".to_owned()))
    }

    /// Revokes a presented raw token.
    pub async fn revoke(&self, raw_token: &str) -> AppResult<()> {
        self.repository.revoke_token(&hash_token(raw_token)).await
    }
}

const TOKEN_BYTES: usize = 32;

/// Draws a fresh random token and returns it as
/// `(raw_token_hex, storage_hash_hex)`.
fn generate_token() -> AppResult<(String, String)> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("token entropy unavailable: {error}")))?;

    let raw_token = encode_hex(&bytes);
    let token_hash = hash_token(&raw_token);
    Ok((raw_token, token_hash))
}

/// Maps a raw token onto the hash it is stored under.
fn hash_token(raw_token: &str) -> String {
    use sha2::{Digest, Sha256};

    encode_hex(&Sha256::digest(raw_token.as_bytes()))
}

/// Lowercase hex rendering shared by raw tokens and stored hashes.
fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(encoded, "{byte:02x}");
    }
    encoded
}
