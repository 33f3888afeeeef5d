use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use shopdesk_auth_types::cookie::SHOPDESK_REFRESH_TOKEN;
use shopdesk_domain::user::UserRole;

use crate::error::AuthServiceError;
use crate::handlers::{ClientMeta, TokenResponse, token_cookies};
use crate::state::AppState;
use crate::usecase::bootstrap::{BootstrapInput, BootstrapUseCase};
use crate::usecase::login::{LoginInput, LoginUseCase};
use crate::usecase::oauth::{OAuthLoginInput, OAuthLoginUseCase};
use crate::usecase::refresh::RefreshTokenUseCase;
use crate::usecase::register::{RegisterInput, RegisterUseCase};

// ── POST /auth/login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        registry: state.session_registry(),
        issuer: state.issuer.clone(),
        lockout: state.lockout,
    };
    let out = usecase
        .execute(LoginInput {
            email: body.email,
            password: body.password,
            meta,
        })
        .await?;

    let (jar, headers) = token_cookies(&state, jar, &out.issued);
    let body = TokenResponse::new(&state, &out.issued).with_user(out.user.summary());
    Ok((StatusCode::OK, jar, headers, Json(body)))
}

// ── POST /auth/register ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
}

pub async fn register(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = RegisterUseCase {
        users: state.user_repo(),
        registry: state.session_registry(),
        issuer: state.issuer.clone(),
        notifier: state.notifier(),
    };
    let out = usecase
        .execute(RegisterInput {
            email: body.email,
            password: body.password,
            username: body.username,
            first_name: body.first_name,
            last_name: body.last_name,
            role: body.role,
            meta,
        })
        .await?;

    let (jar, headers) = token_cookies(&state, jar, &out.issued);
    let body = TokenResponse::new(&state, &out.issued).with_user(out.user.summary());
    Ok((StatusCode::CREATED, jar, headers, Json(body)))
}

// ── POST /auth/bootstrap ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BootstrapRequest {
    pub activation_code: String,
    pub tenant_name: String,
    pub tenant_code: Option<String>,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn bootstrap(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    jar: CookieJar,
    Json(body): Json<BootstrapRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = BootstrapUseCase {
        users: state.user_repo(),
        tenants: state.tenant_repo(),
        registry: state.session_registry(),
        issuer: state.issuer.clone(),
        activation_code: state.activation_code.clone(),
    };
    let out = usecase
        .execute(BootstrapInput {
            activation_code: body.activation_code,
            tenant_name: body.tenant_name,
            tenant_code: body.tenant_code,
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            meta,
        })
        .await?;

    let (jar, headers) = token_cookies(&state, jar, &out.issued);
    let mut body = TokenResponse::new(&state, &out.issued).with_user(out.user.summary());
    body.tenant = Some(out.tenant.summary());
    Ok((StatusCode::CREATED, jar, headers, Json(body)))
}

// ── POST /auth/refresh ────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

pub async fn refresh(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let refresh_value = body
        .and_then(|Json(b)| b.refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| jar.get(SHOPDESK_REFRESH_TOKEN).map(|c| c.value().to_owned()))
        .ok_or(AuthServiceError::InvalidRefreshToken)?;

    let usecase = RefreshTokenUseCase {
        users: state.user_repo(),
        registry: state.session_registry(),
        issuer: state.issuer.clone(),
    };
    let issued = usecase.execute(&refresh_value, &meta).await?;

    let (jar, headers) = token_cookies(&state, jar, &issued);
    let body = TokenResponse::new(&state, &issued);
    Ok((StatusCode::OK, jar, headers, Json(body)))
}

// ── POST /auth/oauth/{provider} ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OAuthLoginRequest {
    pub code: String,
    pub redirect_uri: String,
}

pub async fn oauth_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    ClientMeta(meta): ClientMeta,
    jar: CookieJar,
    Json(body): Json<OAuthLoginRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = OAuthLoginUseCase {
        users: state.user_repo(),
        registry: state.session_registry(),
        issuer: state.issuer.clone(),
        notifier: state.notifier(),
        providers: state.oauth.clone(),
    };
    let out = usecase
        .execute(OAuthLoginInput {
            provider: provider.to_lowercase(),
            code: body.code,
            redirect_uri: body.redirect_uri,
            meta,
        })
        .await?;

    let (jar, headers) = token_cookies(&state, jar, &out.issued);
    let mut body = TokenResponse::new(&state, &out.issued).with_user(out.user.summary());
    body.is_new_user = Some(out.is_new_user);
    Ok((StatusCode::OK, jar, headers, Json(body)))
}
