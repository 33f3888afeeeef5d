use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use shopdesk_auth::domain::lockout::LockoutPolicy;
use shopdesk_auth::domain::repository::{
    FailedLogin, Notifier, OAuthProviderPort, SessionRepository, TenantRepository, Throttle,
    UserRepository,
};
use shopdesk_auth::domain::session::{sessions_to_evict, sort_oldest_first};
use shopdesk_auth::domain::types::{AuthUser, OAuthProfile, Session, SessionMeta, Tenant};
use shopdesk_auth::error::AuthServiceError;
use shopdesk_auth::usecase::crypto::hash_password;
use shopdesk_auth::usecase::session::SessionRegistry;
use shopdesk_auth::usecase::token::{TokenIssuer, TokenSecrets};
use shopdesk_domain::user::{UserRole, UserStatus};

// ── MockUserRepo ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockUserRepo {
    pub users: Arc<Mutex<Vec<AuthUser>>>,
}

impl MockUserRepo {
    pub fn new(users: Vec<AuthUser>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> AuthUser {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .expect("user in mock repo")
    }

    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut AuthUser)) {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == id) {
            f(u);
        }
    }

    fn find(&self, pred: impl Fn(&AuthUser) -> bool) -> Option<AuthUser> {
        self.users.lock().unwrap().iter().find(|u| pred(u)).cloned()
    }
}

impl UserRepository for MockUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthServiceError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError> {
        Ok(self.find(|u| u.id == id))
    }

    async fn find_by_oauth_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<AuthUser>, AuthServiceError> {
        Ok(self.find(|u| {
            u.oauth_provider.as_deref() == Some(provider)
                && u.oauth_provider_id.as_deref() == Some(provider_id)
        }))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthServiceError> {
        Ok(self.find(|u| u.username == username).is_some())
    }

    async fn create(&self, user: &AuthUser) -> Result<(), AuthServiceError> {
        self.users.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn update_last_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        self.update(id, |u| u.last_login_at = Some(at));
        Ok(())
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AuthServiceError> {
        self.update(id, |u| u.password_hash = Some(password_hash.to_owned()));
        Ok(())
    }

    async fn increment_failed_login(
        &self,
        id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<FailedLogin, AuthServiceError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AuthServiceError::UserNotFound)?;
        let (count, lock) = policy.next_after_failure(user.failed_login_attempts, Utc::now());
        user.failed_login_attempts = count;
        if lock.is_some() {
            user.locked_until = lock;
        }
        Ok(FailedLogin {
            failed_attempts: count,
            locked_until: lock,
        })
    }

    async fn reset_failed_login(&self, id: Uuid) -> Result<(), AuthServiceError> {
        self.update(id, |u| {
            u.failed_login_attempts = 0;
            u.locked_until = None;
        });
        Ok(())
    }

    async fn set_password_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        self.update(id, |u| {
            u.password_reset_token_hash = Some(token_hash.to_owned());
            u.password_reset_expires_at = Some(expires_at);
        });
        Ok(())
    }

    async fn consume_password_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthUser>, AuthServiceError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| {
            u.password_reset_token_hash.as_deref() == Some(token_hash)
                && u.password_reset_expires_at.is_some_and(|at| at > now)
        }) else {
            return Ok(None);
        };
        user.password_reset_token_hash = None;
        user.password_reset_expires_at = None;
        Ok(Some(user.clone()))
    }

    async fn link_oauth_provider(
        &self,
        id: Uuid,
        provider: &str,
        provider_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<(), AuthServiceError> {
        self.update(id, |u| {
            u.oauth_provider = Some(provider.to_owned());
            u.oauth_provider_id = Some(provider_id.to_owned());
            if let Some(url) = avatar_url {
                u.avatar_url = Some(url.to_owned());
            }
        });
        Ok(())
    }
}

// ── MockSessionRepo ──────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockSessionRepo {
    pub sessions: Arc<Mutex<Vec<Session>>>,
}

impl MockSessionRepo {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a shared handle to the internal session list for post-execution inspection.
    pub fn sessions_handle(&self) -> Arc<Mutex<Vec<Session>>> {
        Arc::clone(&self.sessions)
    }

    pub fn active_for(&self, user_id: Uuid) -> Vec<Session> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active)
            .cloned()
            .collect()
    }
}

impl SessionRepository for MockSessionRepo {
    async fn create_with_cap(
        &self,
        session: &Session,
        cap: usize,
    ) -> Result<Vec<Uuid>, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut active: Vec<Session> = sessions
            .iter()
            .filter(|s| s.user_id == session.user_id && s.is_active)
            .cloned()
            .collect();
        sort_oldest_first(&mut active);
        let evict = sessions_to_evict(&active, cap);
        for s in sessions.iter_mut().filter(|s| evict.contains(&s.id)) {
            s.is_active = false;
        }
        sessions.push(session.clone());
        Ok(evict)
    }

    async fn find_active_by_hash(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Session>, AuthServiceError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.is_active && s.refresh_token_hash == token_hash)
            .cloned())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(s) = sessions.iter_mut().find(|s| s.id == id) {
            s.is_active = false;
        }
        Ok(())
    }

    async fn rotate_hash(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        at: DateTime<Utc>,
        ip_address: Option<&str>,
    ) -> Result<bool, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(s) = sessions
            .iter_mut()
            .find(|s| s.id == id && s.is_active && s.refresh_token_hash == expected_hash)
        else {
            return Ok(false);
        };
        s.refresh_token_hash = new_hash.to_owned();
        s.last_activity = at;
        if let Some(ip) = ip_address {
            s.ip_address = Some(ip.to_owned());
        }
        Ok(true)
    }

    async fn deactivate_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions
            .iter_mut()
            .find(|s| s.id == id && s.user_id == user_id && s.is_active)
        {
            Some(s) => {
                s.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut revoked = 0;
        for s in sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            s.is_active = false;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn deactivate_others_for_user(
        &self,
        user_id: Uuid,
        keep_id: Uuid,
    ) -> Result<u64, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut revoked = 0;
        for s in sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active && s.id != keep_id)
        {
            s.is_active = false;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut swept = 0;
        for s in sessions
            .iter_mut()
            .filter(|s| s.is_active && s.expires_at <= now)
        {
            s.is_active = false;
            swept += 1;
        }
        Ok(swept)
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError> {
        let now = Utc::now();
        let mut active: Vec<Session> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active && s.expires_at > now)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(active)
    }
}

// ── RacingSessionRepo ────────────────────────────────────────────────────────

/// Wraps [`MockSessionRepo`] so that another request always rotates the
/// session between the lookup and the compare-and-swap.
#[derive(Clone, Default)]
pub struct RacingSessionRepo {
    pub inner: MockSessionRepo,
}

impl SessionRepository for RacingSessionRepo {
    async fn create_with_cap(
        &self,
        session: &Session,
        cap: usize,
    ) -> Result<Vec<Uuid>, AuthServiceError> {
        self.inner.create_with_cap(session, cap).await
    }

    async fn find_active_by_hash(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Session>, AuthServiceError> {
        self.inner.find_active_by_hash(user_id, token_hash).await
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), AuthServiceError> {
        self.inner.deactivate(id).await
    }

    async fn rotate_hash(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        at: DateTime<Utc>,
        ip_address: Option<&str>,
    ) -> Result<bool, AuthServiceError> {
        let won = self
            .inner
            .rotate_hash(id, expected_hash, "rotated-by-concurrent-request", at, None)
            .await?;
        assert!(won, "concurrent rotation should find the original hash");
        self.inner
            .rotate_hash(id, expected_hash, new_hash, at, ip_address)
            .await
    }

    async fn deactivate_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AuthServiceError> {
        self.inner.deactivate_for_user(id, user_id).await
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        self.inner.deactivate_all_for_user(user_id).await
    }

    async fn deactivate_others_for_user(
        &self,
        user_id: Uuid,
        keep_id: Uuid,
    ) -> Result<u64, AuthServiceError> {
        self.inner.deactivate_others_for_user(user_id, keep_id).await
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        self.inner.deactivate_expired(now).await
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError> {
        self.inner.list_active_by_user(user_id).await
    }
}

// ── MockTenantRepo ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockTenantRepo {
    pub tenants: Arc<Mutex<Vec<Tenant>>>,
    pub users: MockUserRepo,
}

impl MockTenantRepo {
    /// Owners created through this repo land in `users`.
    pub fn new(users: MockUserRepo) -> Self {
        Self {
            tenants: Arc::new(Mutex::new(vec![])),
            users,
        }
    }
}

impl TenantRepository for MockTenantRepo {
    async fn find_by_tenant_code(&self, code: &str) -> Result<Option<Tenant>, AuthServiceError> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.tenant_code == code)
            .cloned())
    }

    async fn create_with_owner(
        &self,
        tenant: &Tenant,
        owner: &AuthUser,
    ) -> Result<(), AuthServiceError> {
        self.tenants.lock().unwrap().push(Tenant {
            owner_user_id: Some(owner.id),
            ..tenant.clone()
        });
        self.users.users.lock().unwrap().push(owner.clone());
        Ok(())
    }
}

// ── MockNotifier ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: &'static str,
    pub to: String,
    pub detail: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<SentEmail>>>,
    pub fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with an internal error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    fn record(
        &self,
        kind: &'static str,
        user: &AuthUser,
        detail: Option<&str>,
    ) -> Result<(), AuthServiceError> {
        if self.fail {
            return Err(anyhow::anyhow!("mail outbox unavailable").into());
        }
        self.sent.lock().unwrap().push(SentEmail {
            kind,
            to: user.email.clone(),
            detail: detail.map(str::to_owned),
        });
        Ok(())
    }
}

impl Notifier for MockNotifier {
    async fn send_welcome_email(&self, user: &AuthUser) -> Result<(), AuthServiceError> {
        self.record("welcome", user, None)
    }

    async fn send_password_reset_email(
        &self,
        user: &AuthUser,
        reset_link: &str,
    ) -> Result<(), AuthServiceError> {
        self.record("password_reset", user, Some(reset_link))
    }

    async fn send_oauth_welcome_email(
        &self,
        user: &AuthUser,
        provider: &str,
    ) -> Result<(), AuthServiceError> {
        self.record("oauth_welcome", user, Some(provider))
    }

    async fn send_password_changed_email(&self, user: &AuthUser) -> Result<(), AuthServiceError> {
        self.record("password_changed", user, None)
    }
}

// ── MockThrottle ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockThrottle {
    pub hits: Arc<Mutex<HashMap<String, u32>>>,
    pub unavailable: bool,
}

impl MockThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl Throttle for MockThrottle {
    async fn hit(&self, key: &str, limit: u32, _window_secs: u64) -> Result<bool, AuthServiceError> {
        if self.unavailable {
            return Err(anyhow::anyhow!("redis down").into());
        }
        let mut hits = self.hits.lock().unwrap();
        let count = hits.entry(key.to_owned()).or_insert(0);
        *count += 1;
        Ok(*count <= limit)
    }
}

// ── MockOAuthProvider ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockOAuthProvider {
    pub profile: Option<OAuthProfile>,
}

impl MockOAuthProvider {
    pub fn returning(profile: OAuthProfile) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    pub fn rejecting() -> Self {
        Self { profile: None }
    }
}

impl OAuthProviderPort for MockOAuthProvider {
    async fn fetch_profile(
        &self,
        provider: &str,
        _code: &str,
        _redirect_uri: &str,
    ) -> Result<OAuthProfile, AuthServiceError> {
        match &self.profile {
            Some(p) if p.provider == provider => Ok(p.clone()),
            Some(_) => Err(AuthServiceError::UnsupportedProvider),
            None => Err(AuthServiceError::InvalidCredentials),
        }
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const TEST_ACCESS_SECRET: &str = "test-access-secret-for-integration-tests";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-for-integration-tests";
pub const TEST_PASSWORD: &str = "correct horse battery";

pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(
        TokenSecrets {
            access: TEST_ACCESS_SECRET.to_owned(),
            refresh: TEST_REFRESH_SECRET.to_owned(),
        },
        3600,
        604_800,
    )
}

pub fn registry(sessions: &MockSessionRepo) -> SessionRegistry<MockSessionRepo> {
    SessionRegistry::new(sessions.clone())
}

pub fn meta(user_agent: &str) -> SessionMeta {
    SessionMeta {
        ip_address: Some("203.0.113.10".to_owned()),
        user_agent: Some(user_agent.to_owned()),
    }
}

pub fn test_user(email: &str) -> AuthUser {
    let now = Utc::now() - Duration::days(30);
    AuthUser {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        username: format!("{}_1000", email.split('@').next().unwrap_or("user")),
        first_name: Some("Dana".to_owned()),
        last_name: Some("Reyes".to_owned()),
        tenant_id: Some(Uuid::parse_str("00000000-0000-0000-0000-0000000000aa").unwrap()),
        role: UserRole::Cashier,
        status: UserStatus::Active,
        password_hash: None,
        email_verified: true,
        failed_login_attempts: 0,
        locked_until: None,
        oauth_provider: None,
        oauth_provider_id: None,
        avatar_url: None,
        password_reset_token_hash: None,
        password_reset_expires_at: None,
        last_login_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

/// A user whose password is [`TEST_PASSWORD`].
pub async fn user_with_password(email: &str) -> AuthUser {
    AuthUser {
        password_hash: Some(hash_password(TEST_PASSWORD).await.unwrap()),
        ..test_user(email)
    }
}
