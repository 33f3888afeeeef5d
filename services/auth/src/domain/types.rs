use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use shopdesk_domain::user::{UserRole, UserStatus};

/// Credential-store view of a user: everything the auth core reads or writes.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub role: UserRole,
    pub status: UserStatus,
    /// argon2id PHC string; `None` means the account can only sign in via OAuth.
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub oauth_provider: Option<String>,
    pub oauth_provider_id: Option<String>,
    pub avatar_url: Option<String>,
    pub password_reset_token_hash: Option<String>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthUser {
    /// Name used in emails: full name if known, else the username.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_owned(),
            _ => self.username.clone(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            tenant_id: self.tenant_id,
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Public projection of a user returned alongside issued tokens.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
    pub avatar_url: Option<String>,
}

/// Request metadata recorded on a session.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Server-side session row. Holds only the SHA-256 hex of the current refresh token.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub refresh_token_hash: String,
    pub device_info: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Session as shown to its owner (no secret material).
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: Uuid,
    pub device_info: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(s: Session) -> Self {
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

/// Tenant record written by the bootstrap flow.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub tenant_code: String,
    pub plan: String,
    pub status: String,
    pub features: serde_json::Value,
    pub max_users: i32,
    pub subscription_starts_at: DateTime<Utc>,
    pub subscription_ends_at: DateTime<Utc>,
    pub owner_user_id: Option<Uuid>,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub tenant_code: String,
    pub plan: String,
    pub subscription_ends_at: DateTime<Utc>,
}

impl Tenant {
    pub fn summary(&self) -> TenantSummary {
        TenantSummary {
            id: self.id,
            name: self.name.clone(),
            tenant_code: self.tenant_code.clone(),
            plan: self.plan.clone(),
            subscription_ends_at: self.subscription_ends_at,
        }
    }
}

/// Identity asserted by an OAuth provider after a successful code exchange.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Outbox event for async delivery of account emails.
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub user_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Maximum number of concurrently active sessions per user.
pub const DEFAULT_MAX_SESSIONS_PER_USER: usize = 5;

/// Session lifetime in seconds (7 days).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 604_800;

/// Password-reset ticket lifetime in seconds (1 hour).
pub const PASSWORD_RESET_TTL_SECS: i64 = 3600;

/// Raw password-reset token length in bytes before hex encoding.
pub const PASSWORD_RESET_TOKEN_BYTES: usize = 32;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

const MAX_USERNAME_BASE_LEN: usize = 20;
const MAX_TENANT_CODE_LEN: usize = 12;

/// Lower-case and trim an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check only: one `@`, non-empty local part, dotted domain, no spaces.
pub fn validate_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn validate_password(password: &str) -> bool {
    let len = password.chars().count();
    (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len)
}

/// Explicit usernames: 3-30 chars of `[a-z0-9._]` after lower-casing.
pub fn validate_username(username: &str) -> bool {
    (3..=30).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_')
}

/// Base for an auto-generated username: the given name if any, else the email
/// local part, reduced to `[a-z0-9._]`. A random numeric suffix is appended by
/// the caller.
pub fn username_base(name: Option<&str>, email: &str) -> String {
    let source = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default());
    let base: String = source
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '_')
        .take(MAX_USERNAME_BASE_LEN)
        .collect();
    if base.is_empty() {
        "user".to_owned()
    } else {
        base
    }
}

/// Tenant code from an explicit value or the tenant name: upper-case ASCII
/// alphanumerics, at most 12 chars.
pub fn derive_tenant_code(explicit: Option<&str>, tenant_name: &str) -> String {
    let source = explicit
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(tenant_name);
    let code: String = source
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(MAX_TENANT_CODE_LEN)
        .collect();
    if code.is_empty() {
        "TENANT".to_owned()
    } else {
        code
    }
}

/// Compare a presented activation code with the configured one, ignoring
/// surrounding whitespace and ASCII case. An unset code never matches.
pub fn activation_code_matches(presented: &str, expected: &str) -> bool {
    let expected = expected.trim();
    !expected.is_empty() && presented.trim().eq_ignore_ascii_case(expected)
}
