pub mod auth;
pub mod health;
pub mod password;
pub mod session;
pub mod token;

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header::USER_AGENT};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use uuid::Uuid;

use shopdesk_auth_types::cookie::{set_access_token_cookie, set_refresh_token_cookie};

use crate::domain::types::{SessionMeta, TenantSummary, UserSummary};
use crate::state::AppState;
use crate::usecase::session::IssuedSession;

const X_SHOPDESK_ACCESS_TOKEN_EXPIRES: &str = "x-shopdesk-access-token-expires";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Client IP and user-agent of the current request.
///
/// IP comes from the first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer address.
#[derive(Debug, Clone)]
pub struct ClientMeta(pub SessionMeta);

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn client_ip(parts: &Parts) -> Option<String> {
    header_str(&parts.headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_owned()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_str(&parts.headers, X_REAL_IP))
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let meta = SessionMeta {
            ip_address: client_ip(parts),
            user_agent: header_str(&parts.headers, USER_AGENT.as_str()),
        };
        async move { Ok(Self(meta)) }
    }
}

/// Token pair as returned to clients. Browser clients also get both tokens
/// as cookies.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub access_token_exp: u64,
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_user: Option<bool>,
}

impl TokenResponse {
    pub fn new(state: &AppState, issued: &IssuedSession) -> Self {
        Self {
            access_token: issued.tokens.access_token.clone(),
            refresh_token: issued.tokens.refresh_token.clone(),
            token_type: "Bearer",
            expires_in: state.issuer.access_ttl_secs(),
            access_token_exp: issued.tokens.access_token_exp,
            session_id: issued.session_id,
            user: None,
            tenant: None,
            is_new_user: None,
        }
    }

    pub fn with_user(mut self, user: UserSummary) -> Self {
        self.user = Some(user);
        self
    }
}

/// Set both token cookies and the access-expiry header.
pub fn token_cookies(
    state: &AppState,
    jar: CookieJar,
    issued: &IssuedSession,
) -> (CookieJar, HeaderMap) {
    let jar = set_access_token_cookie(
        jar,
        issued.tokens.access_token.clone(),
        state.cookie_domain.clone(),
        state.issuer.access_ttl_secs(),
    );
    let jar = set_refresh_token_cookie(
        jar,
        issued.tokens.refresh_token.clone(),
        state.cookie_domain.clone(),
        state.issuer.refresh_ttl_secs(),
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(X_SHOPDESK_ACCESS_TOKEN_EXPIRES),
        HeaderValue::from(issued.tokens.access_token_exp),
    );
    (jar, headers)
}
