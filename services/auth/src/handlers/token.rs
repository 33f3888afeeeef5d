use axum::{
    Json,
    extract::Query,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopdesk_auth_types::identity::Identity;
use shopdesk_domain::user::UserRole;

use crate::error::AuthServiceError;

// ── GET /auth/token ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CheckTokenQuery {
    /// Minimum role the caller must hold.
    pub role: Option<UserRole>,
}

#[derive(Serialize)]
pub struct CheckTokenResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub access_token_exp: u64,
}

/// Validate the caller's access token and optionally gate it on a minimum role.
pub async fn check_token(
    identity: Result<Identity, StatusCode>,
    Query(query): Query<CheckTokenQuery>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let identity = identity.map_err(|_| AuthServiceError::InvalidToken)?;

    if let Some(min_role) = query.role {
        if !identity.role.at_least(min_role) {
            return Err(AuthServiceError::Forbidden);
        }
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-shopdesk-access-token-expires"),
        HeaderValue::from(identity.access_token_exp),
    );
    let body = CheckTokenResponse {
        user_id: identity.user_id.0,
        email: identity.email,
        role: identity.role,
        tenant_id: identity.tenant_id.map(|t| t.0),
        access_token_exp: identity.access_token_exp,
    };
    Ok((StatusCode::OK, headers, Json(body)))
}
