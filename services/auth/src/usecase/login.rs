use chrono::Utc;

use crate::domain::lockout::{LockState, LockoutPolicy, remaining_minutes};
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::types::{AuthUser, SessionMeta, normalize_email};
use crate::error::AuthServiceError;
use crate::usecase::crypto::verify_password;
use crate::usecase::session::{IssuedSession, SessionRegistry};
use crate::usecase::token::TokenIssuer;

pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub meta: SessionMeta,
}

/// A signed-in user with a fresh token pair and session.
#[derive(Debug)]
pub struct SignedIn {
    pub user: AuthUser,
    pub issued: IssuedSession,
}

pub struct LoginUseCase<U: UserRepository, S: SessionRepository> {
    pub users: U,
    pub registry: SessionRegistry<S>,
    pub issuer: TokenIssuer,
    pub lockout: LockoutPolicy,
}

impl<U: UserRepository, S: SessionRepository> LoginUseCase<U, S> {
    pub async fn execute(&self, input: LoginInput) -> Result<SignedIn, AuthServiceError> {
        let email = normalize_email(&input.email);
        if email.is_empty() || input.password.is_empty() {
            return Err(AuthServiceError::Validation(
                "email and password are required".to_owned(),
            ));
        }

        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        let now = Utc::now();
        if let LockState::Locked { until } = self.lockout.state(user.locked_until, now) {
            return Err(AuthServiceError::AccountLocked {
                remaining_minutes: remaining_minutes(until, now),
            });
        }

        let Some(password_hash) = user.password_hash.as_deref() else {
            return Err(AuthServiceError::OAuthOnlyAccount {
                provider: user
                    .oauth_provider
                    .clone()
                    .unwrap_or_else(|| "a social login provider".to_owned()),
            });
        };

        if !verify_password(&input.password, password_hash).await? {
            let failed = self
                .users
                .increment_failed_login(user.id, &self.lockout)
                .await?;
            if let Some(until) = failed.locked_until {
                tracing::info!(
                    user_id = %user.id,
                    failed_attempts = failed.failed_attempts,
                    locked_until = %until,
                    "account locked after repeated failures"
                );
            }
            return Err(AuthServiceError::InvalidCredentials);
        }

        if !user.status.is_active() {
            return Err(AuthServiceError::AccountDisabled);
        }

        if user.failed_login_attempts > 0 {
            self.users.reset_failed_login(user.id).await?;
            user.failed_login_attempts = 0;
            user.locked_until = None;
        }
        self.users.update_last_login(user.id, now).await?;
        user.last_login_at = Some(now);

        let issued = self.registry.open(&self.issuer, &user, &input.meta).await?;
        tracing::info!(user_id = %user.id, session_id = %issued.session_id, "login succeeded");

        Ok(SignedIn { user, issued })
    }
}
