//! Authenticated-caller extractor.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum_extra::extract::CookieJar;
use http::request::Parts;
use http::{HeaderMap, StatusCode, header::AUTHORIZATION};

use shopdesk_domain::id::{TenantId, UserId};
use shopdesk_domain::user::UserRole;

use crate::cookie::SHOPDESK_ACCESS_TOKEN;
use crate::token::validate_access_token;

/// Access-token signing secret, pulled out of the router state with [`FromRef`].
#[derive(Clone)]
pub struct AccessTokenSecret(pub Arc<str>);

/// Caller identity taken from a validated access token.
///
/// The token is read from `Authorization: Bearer <token>` first, then from the
/// access-token cookie. Returns 401 if neither is present or validation fails.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
    pub tenant_id: Option<TenantId>,
    /// Expiry of the presented token, seconds since the epoch.
    pub access_token_exp: u64,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SHOPDESK_ACCESS_TOKEN)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    AccessTokenSecret: FromRef<S>,
{
    type Rejection = StatusCode;

    // Resolve synchronously and return a 'static future; axum-core 0.5 declares
    // this method as `fn -> impl Future + Send`.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = AccessTokenSecret::from_ref(state);
        let result = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or(StatusCode::UNAUTHORIZED)
            .and_then(|token| {
                validate_access_token(&token, &secret.0).map_err(|e| {
                    tracing::debug!(error = %e, "access token rejected");
                    StatusCode::UNAUTHORIZED
                })
            });

        async move {
            let info = result?;
            Ok(Self {
                user_id: info.user_id,
                email: info.email,
                role: info.role,
                tenant_id: info.tenant_id,
                access_token_exp: info.access_token_exp,
            })
        }
    }
}
