use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use shopdesk_auth_types::identity::Identity;

use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::password::{
    ChangePasswordInput, ChangePasswordUseCase, ForgotPasswordUseCase, ResetPasswordUseCase,
};

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ── POST /auth/password/forgot ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = ForgotPasswordUseCase {
        users: state.user_repo(),
        notifier: state.notifier(),
        throttle: state.throttle(),
        frontend_url: state.frontend_url.clone(),
        reset_ttl: state.password_reset_ttl,
        limit: state.forgot_password_limit,
        window_secs: state.forgot_password_window_secs,
    };
    let message = usecase.execute(&body.email).await?;
    Ok(Json(MessageResponse { message }))
}

// ── POST /auth/password/reset ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = ResetPasswordUseCase {
        users: state.user_repo(),
        registry: state.session_registry(),
        notifier: state.notifier(),
    };
    usecase.execute(&body.token, &body.new_password).await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset. Please sign in again.",
    }))
}

// ── POST /auth/password/change ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = ChangePasswordUseCase {
        users: state.user_repo(),
        notifier: state.notifier(),
    };
    usecase
        .execute(ChangePasswordInput {
            user_id: identity.user_id.0,
            current_password: body.current_password,
            new_password: body.new_password,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
