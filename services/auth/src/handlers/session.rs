use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopdesk_auth_types::cookie::{SHOPDESK_REFRESH_TOKEN, clear_cookies};
use shopdesk_auth_types::identity::Identity;
use shopdesk_core::serde::to_rfc3339_ms;

use crate::domain::types::SessionInfo;
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::sessions::{
    Actor, AdminRevokeSessionsUseCase, ListSessionsUseCase, LogoutAllUseCase, LogoutInput,
    LogoutUseCase, RevokeOtherSessionsUseCase, RevokeSessionUseCase,
};

#[derive(Serialize)]
pub struct RevokedResponse {
    pub revoked_count: u64,
}

// ── POST /auth/logout ─────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct LogoutRequest {
    pub session_id: Option<Uuid>,
    pub refresh_token: Option<String>,
}

pub async fn logout(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
    body: Option<Json<LogoutRequest>>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let Json(body) = body.unwrap_or_default();
    let refresh_token = body
        .refresh_token
        .or_else(|| jar.get(SHOPDESK_REFRESH_TOKEN).map(|c| c.value().to_owned()));

    let usecase = LogoutUseCase {
        registry: state.session_registry(),
    };
    usecase
        .execute(LogoutInput {
            user_id: identity.user_id.0,
            session_id: body.session_id,
            refresh_token,
        })
        .await?;

    let jar = clear_cookies(jar, state.cookie_domain.clone());
    Ok((StatusCode::NO_CONTENT, jar))
}

// ── POST /auth/logout-all ─────────────────────────────────────────────────────

pub async fn logout_all(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = LogoutAllUseCase {
        registry: state.session_registry(),
    };
    let revoked_count = usecase.execute(identity.user_id.0).await?;

    let jar = clear_cookies(jar, state.cookie_domain.clone());
    Ok((StatusCode::OK, jar, Json(RevokedResponse { revoked_count })))
}

// ── GET /auth/sessions ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub device_info: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub last_activity: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<SessionInfo> for SessionResponse {
    fn from(s: SessionInfo) -> Self {
        Self {
            id: s.id,
            device_info: s.device_info,
            ip_address: s.ip_address,
            user_agent: s.user_agent,
            last_activity: s.last_activity,
            expires_at: s.expires_at,
            created_at: s.created_at,
        }
    }
}

pub async fn list_sessions(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = ListSessionsUseCase {
        registry: state.session_registry(),
    };
    let sessions = usecase.execute(identity.user_id.0).await?;
    let body: Vec<SessionResponse> = sessions.into_iter().map(SessionResponse::from).collect();
    Ok(Json(body))
}

// ── DELETE /auth/sessions/{session_id} ────────────────────────────────────────

pub async fn revoke_session(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = RevokeSessionUseCase {
        registry: state.session_registry(),
    };
    usecase.execute(identity.user_id.0, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /auth/sessions/revoke-others ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct RevokeOthersRequest {
    pub keep_session_id: Uuid,
}

pub async fn revoke_other_sessions(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<RevokeOthersRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = RevokeOtherSessionsUseCase {
        registry: state.session_registry(),
    };
    let revoked_count = usecase
        .execute(identity.user_id.0, body.keep_session_id)
        .await?;
    Ok(Json(RevokedResponse { revoked_count }))
}

// ── POST /auth/users/{user_id}/sessions/revoke ────────────────────────────────

pub async fn admin_revoke_sessions(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = AdminRevokeSessionsUseCase {
        users: state.user_repo(),
        registry: state.session_registry(),
    };
    let actor = Actor {
        user_id: identity.user_id.0,
        role: identity.role,
        tenant_id: identity.tenant_id.map(|t| t.0),
    };
    let revoked_count = usecase.execute(actor, user_id).await?;
    Ok(Json(RevokedResponse { revoked_count }))
}
