use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopdesk_auth_types::token::{AccessClaims, decode_hs256};
use shopdesk_domain::user::UserRole;

use crate::config::ConfigError;
use crate::domain::types::AuthUser;
use crate::error::AuthServiceError;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 604_800;

const MIN_SECRET_LEN: usize = 32;
const REFRESH_TOKEN_TYPE: &str = "refresh";

const DEV_ACCESS_SECRET: &str = "shopdesk-dev-access-secret-not-for-production";
const DEV_REFRESH_SECRET: &str = "shopdesk-dev-refresh-secret-not-for-production";

/// The two independent HMAC keys. Access tokens never verify as refresh
/// tokens and vice versa.
#[derive(Clone)]
pub struct TokenSecrets {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecrets").finish_non_exhaustive()
    }
}

impl TokenSecrets {
    /// Resolve signing secrets at boot.
    ///
    /// In production a missing or short secret, or the same secret for both
    /// kinds, is fatal. Elsewhere a missing secret falls back to a fixed
    /// development value.
    pub fn resolve(
        production: bool,
        access: Option<String>,
        refresh: Option<String>,
    ) -> Result<Self, ConfigError> {
        let access = resolve_one(production, "JWT_ACCESS_SECRET", access, DEV_ACCESS_SECRET)?;
        let refresh = resolve_one(production, "JWT_REFRESH_SECRET", refresh, DEV_REFRESH_SECRET)?;
        if production && access == refresh {
            return Err(ConfigError::SharedSecret);
        }
        Ok(Self { access, refresh })
    }
}

fn resolve_one(
    production: bool,
    name: &'static str,
    value: Option<String>,
    fallback: &str,
) -> Result<String, ConfigError> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) if production && v.len() < MIN_SECRET_LEN => Err(ConfigError::WeakSecret {
            name,
            min_len: MIN_SECRET_LEN,
        }),
        Some(v) => Ok(v),
        None if production => Err(ConfigError::MissingSecret(name)),
        None => {
            tracing::warn!(secret = name, "signing secret not set, using development fallback");
            Ok(fallback.to_owned())
        }
    }
}

/// Refresh-token claims: the access payload plus a type discriminator and a
/// unique id so two tokens minted in the same second still differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(rename = "type", default)]
    pub token_type: Option<String>,
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_exp: u64,
    pub refresh_token: String,
    pub refresh_token_exp: u64,
}

/// Mints and verifies token pairs. Pure: no storage, no clock beyond `now`.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secrets: TokenSecrets,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secrets: TokenSecrets, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            secrets,
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    pub fn issue_pair(&self, user: &AuthUser) -> Result<TokenPair, AuthServiceError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let access_token_exp = now + self.access_ttl_secs;
        let refresh_token_exp = now + self.refresh_ttl_secs;

        let access = AccessClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
            iat: now,
            exp: access_token_exp,
        };
        let refresh = RefreshClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
            token_type: Some(REFRESH_TOKEN_TYPE.to_owned()),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: refresh_token_exp,
        };

        Ok(TokenPair {
            access_token: sign(&access, &self.secrets.access)?,
            access_token_exp,
            refresh_token: sign(&refresh, &self.secrets.refresh)?,
            refresh_token_exp,
        })
    }

    /// Verify signature, expiry and the `type: refresh` discriminator.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthServiceError> {
        let claims: RefreshClaims = decode_hs256(token, &self.secrets.refresh).map_err(|e| {
            tracing::debug!(error = %e, "refresh token rejected");
            AuthServiceError::InvalidRefreshToken
        })?;
        if claims.token_type.as_deref() != Some(REFRESH_TOKEN_TYPE) {
            return Err(AuthServiceError::InvalidRefreshToken);
        }
        Ok(claims)
    }
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, AuthServiceError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthServiceError::Internal(e.into()))
}
