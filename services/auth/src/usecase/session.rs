use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::repository::SessionRepository;
use crate::domain::session::device_label;
use crate::domain::types::{
    AuthUser, DEFAULT_MAX_SESSIONS_PER_USER, DEFAULT_SESSION_TTL_SECS, Session, SessionInfo,
    SessionMeta,
};
use crate::error::AuthServiceError;
use crate::usecase::crypto::sha256_hex;
use crate::usecase::token::{TokenIssuer, TokenPair};

/// Server-side sessions bound to hashed refresh tokens, capped per user.
#[derive(Clone)]
pub struct SessionRegistry<S: SessionRepository> {
    pub sessions: S,
    pub max_sessions: usize,
    pub session_ttl: Duration,
}

impl<S: SessionRepository> SessionRegistry<S> {
    pub fn new(sessions: S) -> Self {
        Self {
            sessions,
            max_sessions: DEFAULT_MAX_SESSIONS_PER_USER,
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }

    /// Store a new active session for `refresh_token`, evicting the user's
    /// oldest active sessions beyond the cap.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        refresh_token: &str,
        meta: &SessionMeta,
    ) -> Result<Session, AuthServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::now_v7(),
            user_id,
            tenant_id,
            refresh_token_hash: sha256_hex(refresh_token),
            device_info: device_label(meta.user_agent.as_deref()),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            is_active: true,
            last_activity: now,
            expires_at: now + self.session_ttl,
            created_at: now,
            updated_at: now,
        };
        let evicted = self
            .sessions
            .create_with_cap(&session, self.max_sessions)
            .await?;
        if !evicted.is_empty() {
            tracing::info!(
                user_id = %user_id,
                evicted = evicted.len(),
                "session cap reached, evicted oldest sessions"
            );
        }
        Ok(session)
    }

    /// The active session holding `refresh_token`, if any. A match that has
    /// already expired is deactivated and reported as absent.
    pub async fn validate_refresh_token(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<Option<Session>, AuthServiceError> {
        let hash = sha256_hex(refresh_token);
        let Some(session) = self.sessions.find_active_by_hash(user_id, &hash).await? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            self.sessions.deactivate(session.id).await?;
            tracing::debug!(session_id = %session.id, "expired session deactivated on use");
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Replace the session's refresh hash in place. Returns `false` if the
    /// session no longer holds the hash it was validated with.
    pub async fn rotate_refresh_token(
        &self,
        session: &Session,
        new_refresh_token: &str,
        ip_address: Option<&str>,
    ) -> Result<bool, AuthServiceError> {
        self.sessions
            .rotate_hash(
                session.id,
                &session.refresh_token_hash,
                &sha256_hex(new_refresh_token),
                Utc::now(),
                ip_address,
            )
            .await
    }

    pub async fn revoke_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AuthServiceError> {
        self.sessions.deactivate_for_user(session_id, user_id).await
    }

    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        self.sessions.deactivate_all_for_user(user_id).await
    }

    pub async fn revoke_other_sessions(
        &self,
        user_id: Uuid,
        keep_session_id: Uuid,
    ) -> Result<u64, AuthServiceError> {
        self.sessions
            .deactivate_others_for_user(user_id, keep_session_id)
            .await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthServiceError> {
        self.sessions.deactivate_expired(Utc::now()).await
    }

    pub async fn get_user_sessions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SessionInfo>, AuthServiceError> {
        let sessions = self.sessions.list_active_by_user(user_id).await?;
        Ok(sessions.into_iter().map(SessionInfo::from).collect())
    }

    /// Mint a token pair for `user` and open a session bound to its refresh token.
    pub async fn open(
        &self,
        issuer: &TokenIssuer,
        user: &AuthUser,
        meta: &SessionMeta,
    ) -> Result<IssuedSession, AuthServiceError> {
        let tokens = issuer.issue_pair(user)?;
        let session = self
            .create_session(user.id, user.tenant_id, &tokens.refresh_token, meta)
            .await?;
        Ok(IssuedSession {
            tokens,
            session_id: session.id,
        })
    }
}

/// Token pair plus the session it is bound to.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub tokens: TokenPair,
    pub session_id: Uuid,
}
