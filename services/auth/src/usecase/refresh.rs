use uuid::Uuid;

use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::types::SessionMeta;
use crate::error::AuthServiceError;
use crate::usecase::session::{IssuedSession, SessionRegistry};
use crate::usecase::token::TokenIssuer;

/// Rotates a refresh token on its session. Presenting a token that verifies
/// but no longer matches an active session revokes every session of the user.
pub struct RefreshTokenUseCase<U: UserRepository, S: SessionRepository> {
    pub users: U,
    pub registry: SessionRegistry<S>,
    pub issuer: TokenIssuer,
}

impl<U: UserRepository, S: SessionRepository> RefreshTokenUseCase<U, S> {
    pub async fn execute(
        &self,
        refresh_token: &str,
        meta: &SessionMeta,
    ) -> Result<IssuedSession, AuthServiceError> {
        let claims = self.issuer.verify_refresh_token(refresh_token)?;
        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| AuthServiceError::InvalidRefreshToken)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.status.is_active())
            .ok_or(AuthServiceError::InvalidRefreshToken)?;

        let Some(session) = self
            .registry
            .validate_refresh_token(user.id, refresh_token)
            .await?
        else {
            return Err(self.breach(user.id).await?);
        };

        let tokens = self.issuer.issue_pair(&user)?;
        let rotated = self
            .registry
            .rotate_refresh_token(&session, &tokens.refresh_token, meta.ip_address.as_deref())
            .await?;
        if !rotated {
            // Another request rotated this session first with the same token.
            return Err(self.breach(user.id).await?);
        }

        tracing::debug!(user_id = %user.id, session_id = %session.id, "refresh token rotated");
        Ok(IssuedSession {
            tokens,
            session_id: session.id,
        })
    }

    async fn breach(&self, user_id: Uuid) -> Result<AuthServiceError, AuthServiceError> {
        let revoked = self.registry.revoke_all_sessions(user_id).await?;
        tracing::warn!(
            user_id = %user_id,
            revoked,
            "refresh token reuse detected, all sessions revoked"
        );
        Ok(AuthServiceError::RefreshTokenReused)
    }
}
