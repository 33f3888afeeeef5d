#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::lockout::LockoutPolicy;
use crate::domain::types::{AuthUser, OAuthProfile, Session, Tenant};
use crate::error::AuthServiceError;

/// Counters after a failed password check was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedLogin {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Credential store: user identity, password hash, lockout counters, reset
/// ticket and OAuth link.
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthServiceError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError>;
    async fn find_by_oauth_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<AuthUser>, AuthServiceError>;
    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthServiceError>;

    async fn create(&self, user: &AuthUser) -> Result<(), AuthServiceError>;

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>)
    -> Result<(), AuthServiceError>;
    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AuthServiceError>;

    /// Record one failed password check and apply `policy` in a single atomic
    /// step, so concurrent failures never lose an increment.
    async fn increment_failed_login(
        &self,
        id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<FailedLogin, AuthServiceError>;
    async fn reset_failed_login(&self, id: Uuid) -> Result<(), AuthServiceError>;

    /// Overwrites any earlier ticket.
    async fn set_password_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError>;
    /// Clear the ticket matching `token_hash` if it is still valid at `now` and
    /// return its owner. Of concurrent callers presenting the same ticket, at
    /// most one gets `Some`.
    async fn consume_password_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthUser>, AuthServiceError>;

    async fn link_oauth_provider(
        &self,
        id: Uuid,
        provider: &str,
        provider_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<(), AuthServiceError>;
}

/// Persistent session rows. Per-user mutations that read then write
/// (eviction, revoke-all) are serialized by the implementation.
pub trait SessionRepository: Send + Sync {
    /// Deactivate the oldest active sessions so that at most `cap` remain once
    /// `session` is inserted, then insert it. Returns the evicted ids.
    async fn create_with_cap(
        &self,
        session: &Session,
        cap: usize,
    ) -> Result<Vec<Uuid>, AuthServiceError>;

    async fn find_active_by_hash(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Session>, AuthServiceError>;

    async fn deactivate(&self, id: Uuid) -> Result<(), AuthServiceError>;

    /// Swap the refresh hash iff the session is still active and still holds
    /// `expected_hash`. Returns `false` when another caller won the race.
    async fn rotate_hash(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        at: DateTime<Utc>,
        ip_address: Option<&str>,
    ) -> Result<bool, AuthServiceError>;

    /// Deactivate one active session owned by `user_id`. `false` if none matched.
    async fn deactivate_for_user(&self, id: Uuid, user_id: Uuid)
    -> Result<bool, AuthServiceError>;
    async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError>;
    async fn deactivate_others_for_user(
        &self,
        user_id: Uuid,
        keep_id: Uuid,
    ) -> Result<u64, AuthServiceError>;
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError>;

    /// Active sessions, most recent activity first.
    async fn list_active_by_user(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError>;
}

pub trait TenantRepository: Send + Sync {
    async fn find_by_tenant_code(&self, code: &str) -> Result<Option<Tenant>, AuthServiceError>;

    /// Insert the tenant and its first user, and point `tenant.owner_user_id`
    /// at that user, all in one transaction.
    async fn create_with_owner(
        &self,
        tenant: &Tenant,
        owner: &AuthUser,
    ) -> Result<(), AuthServiceError>;
}

/// Account emails. Callers treat every send as best-effort.
pub trait Notifier: Send + Sync {
    async fn send_welcome_email(&self, user: &AuthUser) -> Result<(), AuthServiceError>;
    async fn send_password_reset_email(
        &self,
        user: &AuthUser,
        reset_link: &str,
    ) -> Result<(), AuthServiceError>;
    async fn send_oauth_welcome_email(
        &self,
        user: &AuthUser,
        provider: &str,
    ) -> Result<(), AuthServiceError>;
    async fn send_password_changed_email(&self, user: &AuthUser) -> Result<(), AuthServiceError>;
}

/// Fixed-window request counter kept outside the process.
pub trait Throttle: Send + Sync {
    /// Count one hit on `key`. Returns `false` once more than `limit` hits
    /// landed in the current window.
    async fn hit(&self, key: &str, limit: u32, window_secs: u64) -> Result<bool, AuthServiceError>;
}

/// Exchanges an OAuth authorization code for the provider's user profile.
pub trait OAuthProviderPort: Send + Sync {
    async fn fetch_profile(
        &self,
        provider: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthProfile, AuthServiceError>;
}
