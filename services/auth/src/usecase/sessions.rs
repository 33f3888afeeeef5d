use uuid::Uuid;

use shopdesk_domain::user::UserRole;

use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::types::SessionInfo;
use crate::error::AuthServiceError;
use crate::usecase::session::SessionRegistry;

// ── Logout ───────────────────────────────────────────────────────────────────

pub struct LogoutInput {
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    /// Raw refresh token from the cookie or body, used when no session id is given.
    pub refresh_token: Option<String>,
}

pub struct LogoutUseCase<S: SessionRepository> {
    pub registry: SessionRegistry<S>,
}

impl<S: SessionRepository> LogoutUseCase<S> {
    pub async fn execute(&self, input: LogoutInput) -> Result<(), AuthServiceError> {
        if let Some(session_id) = input.session_id {
            if !self.registry.revoke_session(session_id, input.user_id).await? {
                return Err(AuthServiceError::SessionNotFound);
            }
            tracing::info!(user_id = %input.user_id, session_id = %session_id, "logged out");
            return Ok(());
        }

        let Some(token) = input.refresh_token.filter(|t| !t.is_empty()) else {
            // Nothing identifies a session; the client just drops its tokens.
            return Ok(());
        };
        if let Some(session) = self
            .registry
            .validate_refresh_token(input.user_id, &token)
            .await?
        {
            self.registry.revoke_session(session.id, input.user_id).await?;
            tracing::info!(user_id = %input.user_id, session_id = %session.id, "logged out");
        }
        Ok(())
    }
}

// ── LogoutAll ────────────────────────────────────────────────────────────────

pub struct LogoutAllUseCase<S: SessionRepository> {
    pub registry: SessionRegistry<S>,
}

impl<S: SessionRepository> LogoutAllUseCase<S> {
    pub async fn execute(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let revoked = self.registry.revoke_all_sessions(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "logged out everywhere");
        Ok(revoked)
    }
}

// ── ListSessions ─────────────────────────────────────────────────────────────

pub struct ListSessionsUseCase<S: SessionRepository> {
    pub registry: SessionRegistry<S>,
}

impl<S: SessionRepository> ListSessionsUseCase<S> {
    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<SessionInfo>, AuthServiceError> {
        self.registry.get_user_sessions(user_id).await
    }
}

// ── RevokeSession ────────────────────────────────────────────────────────────

pub struct RevokeSessionUseCase<S: SessionRepository> {
    pub registry: SessionRegistry<S>,
}

impl<S: SessionRepository> RevokeSessionUseCase<S> {
    pub async fn execute(&self, user_id: Uuid, session_id: Uuid) -> Result<(), AuthServiceError> {
        if !self.registry.revoke_session(session_id, user_id).await? {
            return Err(AuthServiceError::SessionNotFound);
        }
        Ok(())
    }
}

// ── RevokeOtherSessions ──────────────────────────────────────────────────────

pub struct RevokeOtherSessionsUseCase<S: SessionRepository> {
    pub registry: SessionRegistry<S>,
}

impl<S: SessionRepository> RevokeOtherSessionsUseCase<S> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        keep_session_id: Uuid,
    ) -> Result<u64, AuthServiceError> {
        self.registry
            .revoke_other_sessions(user_id, keep_session_id)
            .await
    }
}

// ── AdminRevokeSessions ──────────────────────────────────────────────────────

/// The authenticated caller of an administrative operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
}

/// Whether `actor` may revoke the sessions of a user with `target_role` in
/// `target_tenant`: admin or above, strictly outranking the target unless
/// the actor is an owner, and inside the same tenant.
pub fn can_revoke_sessions_of(
    actor: &Actor,
    target_role: UserRole,
    target_tenant: Option<Uuid>,
) -> bool {
    let outranks = actor.role == UserRole::Owner || actor.role > target_role;
    let same_tenant = actor.tenant_id.is_some() && actor.tenant_id == target_tenant;
    actor.role.at_least(UserRole::Admin) && outranks && same_tenant
}

pub struct AdminRevokeSessionsUseCase<U: UserRepository, S: SessionRepository> {
    pub users: U,
    pub registry: SessionRegistry<S>,
}

impl<U: UserRepository, S: SessionRepository> AdminRevokeSessionsUseCase<U, S> {
    pub async fn execute(&self, actor: Actor, target_user_id: Uuid) -> Result<u64, AuthServiceError> {
        if !actor.role.at_least(UserRole::Admin) {
            return Err(AuthServiceError::Forbidden);
        }
        let target = self
            .users
            .find_by_id(target_user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        if !can_revoke_sessions_of(&actor, target.role, target.tenant_id) {
            return Err(AuthServiceError::Forbidden);
        }

        let revoked = self.registry.revoke_all_sessions(target.id).await?;
        tracing::info!(
            actor_id = %actor.user_id,
            target_user_id = %target.id,
            revoked,
            "sessions revoked by administrator"
        );
        Ok(revoked)
    }
}
