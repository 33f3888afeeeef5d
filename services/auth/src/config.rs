use serde::Deserialize;

use shopdesk_core::config::Config;

/// Auth service configuration loaded from environment variables.
///
/// Field `foo_bar` reads env var `FOO_BAR`. Everything except the connection
/// URLs and the cookie domain has a default.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// `production` turns on strict secret checks.
    #[serde(default = "default_app_env")]
    pub app_env: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// Cookie domain attribute (root domain, e.g. "shop.example").
    pub cookie_domain: String,
    /// TCP port to listen on.
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,

    pub jwt_access_secret: Option<String>,
    pub jwt_refresh_secret: Option<String>,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: i64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_user: usize,
    /// How often the expired-session sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub session_sweep_interval_secs: u64,

    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,

    #[serde(default = "default_reset_ttl")]
    pub password_reset_ttl_secs: i64,
    /// Forgot-password requests allowed per email per window.
    #[serde(default = "default_forgot_limit")]
    pub forgot_password_limit: u32,
    #[serde(default = "default_forgot_window")]
    pub forgot_password_window_secs: u64,
    /// Base URL of the web app; reset links point at `{frontend_url}/reset-password`.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Shared code required to provision the first tenant. Unset disables bootstrap.
    #[serde(default)]
    pub bootstrap_activation_code: String,

    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
}

impl Config for AuthConfig {}

impl AuthConfig {
    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

/// Startup misconfiguration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingSecret(&'static str),
    #[error("{name} must be at least {min_len} bytes in production")]
    WeakSecret { name: &'static str, min_len: usize },
    #[error("access and refresh tokens must be signed with different secrets")]
    SharedSecret,
    #[error("invalid FRONTEND_URL: {0}")]
    InvalidFrontendUrl(#[from] url::ParseError),
}

fn default_app_env() -> String {
    "development".to_owned()
}

fn default_auth_port() -> u16 {
    3112
}

fn default_access_ttl() -> u64 {
    crate::usecase::token::DEFAULT_ACCESS_TOKEN_TTL_SECS
}

fn default_refresh_ttl() -> u64 {
    crate::usecase::token::DEFAULT_REFRESH_TOKEN_TTL_SECS
}

fn default_session_ttl() -> i64 {
    crate::domain::types::DEFAULT_SESSION_TTL_SECS
}

fn default_max_sessions() -> usize {
    crate::domain::types::DEFAULT_MAX_SESSIONS_PER_USER
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_lockout_threshold() -> u32 {
    5
}

fn default_lockout_minutes() -> i64 {
    15
}

fn default_reset_ttl() -> i64 {
    crate::domain::types::PASSWORD_RESET_TTL_SECS
}

fn default_forgot_limit() -> u32 {
    5
}

fn default_forgot_window() -> u64 {
    3600
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_owned()
}
