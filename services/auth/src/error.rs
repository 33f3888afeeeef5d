use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is locked, try again in {remaining_minutes} minute(s)")]
    AccountLocked { remaining_minutes: i64 },
    #[error("this account signs in with {provider}")]
    OAuthOnlyAccount { provider: String },
    #[error("account is disabled")]
    AccountDisabled,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("refresh token reuse detected; all sessions revoked")]
    RefreshTokenReused,
    #[error("invalid or expired reset token")]
    InvalidResetToken,
    #[error("current password is incorrect")]
    InvalidCurrentPassword,
    #[error("new password must differ from the current one")]
    PasswordUnchanged,
    #[error("email already registered")]
    EmailTaken,
    #[error("tenant code already in use")]
    TenantCodeTaken,
    #[error("invalid activation code")]
    InvalidActivationCode,
    #[error("session not found")]
    SessionNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("unsupported oauth provider")]
    UnsupportedProvider,
    #[error("oauth profile has no email")]
    OAuthProfileIncomplete,
    #[error("{0}")]
    Validation(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            Self::OAuthOnlyAccount { .. } => "OAUTH_ONLY_ACCOUNT",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::RefreshTokenReused => "REFRESH_TOKEN_REUSED",
            Self::InvalidResetToken => "INVALID_RESET_TOKEN",
            Self::InvalidCurrentPassword => "INVALID_CURRENT_PASSWORD",
            Self::PasswordUnchanged => "PASSWORD_UNCHANGED",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::TenantCodeTaken => "TENANT_CODE_TAKEN",
            Self::InvalidActivationCode => "INVALID_ACTIVATION_CODE",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::UnsupportedProvider => "UNSUPPORTED_PROVIDER",
            Self::OAuthProfileIncomplete => "OAUTH_PROFILE_INCOMPLETE",
            Self::Validation(_) => "VALIDATION",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::OAuthOnlyAccount { .. }
            | Self::InvalidToken
            | Self::InvalidRefreshToken
            | Self::RefreshTokenReused => StatusCode::UNAUTHORIZED,
            Self::AccountLocked { .. } => StatusCode::LOCKED,
            Self::AccountDisabled | Self::InvalidActivationCode | Self::Forbidden => {
                StatusCode::FORBIDDEN
            }
            Self::InvalidResetToken
            | Self::InvalidCurrentPassword
            | Self::PasswordUnchanged
            | Self::UnsupportedProvider
            | Self::OAuthProfileIncomplete => StatusCode::BAD_REQUEST,
            Self::EmailTaken | Self::TenantCodeTaken => StatusCode::CONFLICT,
            Self::SessionNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer already records every request; only 500s carry a chain worth logging.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
