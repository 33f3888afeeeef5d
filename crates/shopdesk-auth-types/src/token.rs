//! JWT access-token claims and validation.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test))]
use serde::Serialize;
use uuid::Uuid;

use shopdesk_domain::id::{TenantId, UserId};
use shopdesk_domain::user::UserRole;

/// User identity extracted from a validated access token.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
    pub tenant_id: Option<TenantId>,
    pub access_token_exp: u64,
}

/// Errors returned by [`validate_access_token`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// Access-token claims payload.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | user ID (UUID string) |
/// | `email` | custom | account email |
/// | `role` | custom | [`UserRole`] as snake_case string |
/// | `tenant_id` | custom | owning tenant, absent for tenant-less accounts |
/// | `iat` / `exp` | `iat` / `exp` | seconds since epoch |
///
/// [`Serialize`] requires the **`USE_ONLY_IN_AUTH_SERVICE`** feature: only the
/// auth service mints tokens.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test), derive(Serialize))]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub iat: u64,
    pub exp: u64,
}

/// Decode and validate an HS256 JWT into `T`.
///
/// Validation: exp checked, required claims `exp` + `sub`, default 60s leeway.
pub fn decode_hs256<T>(token: &str, secret: &str) -> Result<T, AuthError>
where
    T: serde::de::DeserializeOwned,
{
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    })?;

    Ok(data.claims)
}

/// Validate an access token (bearer or cookie value), returning parsed identity.
///
/// Every service calls this with the access-token secret. Refresh tokens are
/// signed with a different secret and fail here with `InvalidSignature`.
pub fn validate_access_token(token: &str, secret: &str) -> Result<TokenInfo, AuthError> {
    let claims: AccessClaims = decode_hs256(token, secret)?;
    let user_id = claims
        .sub
        .parse::<UserId>()
        .map_err(|_| AuthError::Malformed)?;
    Ok(TokenInfo {
        user_id,
        email: claims.email,
        role: claims.role,
        tenant_id: claims.tenant_id.map(TenantId),
        access_token_exp: claims.exp,
    })
}
