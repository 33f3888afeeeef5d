use anyhow::Context as _;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::RngExt;
use sha2::{Digest, Sha256};

use crate::domain::types::PASSWORD_RESET_TOKEN_BYTES;
use crate::error::AuthServiceError;

/// Hash a password with argon2id on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AuthServiceError> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || {
        let salt_bytes: [u8; 16] = rand::rng().random();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| anyhow::anyhow!("encode salt: {e}"))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| anyhow::anyhow!("hash password: {e}"))
    })
    .await
    .context("join password hashing task")??;
    Ok(hash)
}

/// Check a password against a stored PHC string on the blocking pool.
/// An unparseable stored hash counts as a mismatch.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthServiceError> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    let ok = tokio::task::spawn_blocking(move || match PasswordHash::new(&stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
            false
        }
    })
    .await
    .context("join password verification task")?;
    Ok(ok)
}

/// Lower-case hex SHA-256, used for refresh and reset token lookup keys.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Fresh raw password-reset token (hex). Only its hash is ever stored.
pub fn generate_reset_token() -> String {
    let bytes: [u8; PASSWORD_RESET_TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// Four-digit suffix for generated usernames.
pub fn username_suffix() -> u16 {
    rand::rng().random_range(1000..10000)
}
