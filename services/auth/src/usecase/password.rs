use chrono::{Duration, Utc};
use url::Url;
use uuid::Uuid;

use crate::domain::repository::{Notifier, SessionRepository, Throttle, UserRepository};
use crate::domain::types::{PASSWORD_RESET_TTL_SECS, normalize_email, validate_password};
use crate::error::AuthServiceError;
use crate::usecase::crypto::{generate_reset_token, hash_password, sha256_hex, verify_password};
use crate::usecase::notify_best_effort;
use crate::usecase::session::SessionRegistry;

/// Returned for every forgot-password request, whatever happened.
pub const GENERIC_RESET_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

fn require_valid_new_password(password: &str) -> Result<(), AuthServiceError> {
    if validate_password(password) {
        Ok(())
    } else {
        Err(AuthServiceError::Validation(
            "password must be 8 to 128 characters".to_owned(),
        ))
    }
}

/// `{frontend}/reset-password?token={raw}`.
pub fn reset_link(frontend_url: &Url, raw_token: &str) -> Result<Url, AuthServiceError> {
    let mut link = frontend_url.clone();
    link.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("frontend url cannot be a base: {frontend_url}"))?
        .pop_if_empty()
        .push("reset-password");
    link.query_pairs_mut().clear().append_pair("token", raw_token);
    Ok(link)
}

// ── ForgotPassword ───────────────────────────────────────────────────────────

pub struct ForgotPasswordUseCase<U, N, T>
where
    U: UserRepository,
    N: Notifier,
    T: Throttle,
{
    pub users: U,
    pub notifier: N,
    pub throttle: T,
    pub frontend_url: Url,
    pub reset_ttl: Duration,
    pub limit: u32,
    pub window_secs: u64,
}

impl<U, N, T> ForgotPasswordUseCase<U, N, T>
where
    U: UserRepository,
    N: Notifier,
    T: Throttle,
{
    pub fn new(users: U, notifier: N, throttle: T, frontend_url: Url) -> Self {
        Self {
            users,
            notifier,
            throttle,
            frontend_url,
            reset_ttl: Duration::seconds(PASSWORD_RESET_TTL_SECS),
            limit: 5,
            window_secs: 3600,
        }
    }

    /// Always answers with [`GENERIC_RESET_MESSAGE`]; only storage failures
    /// on an eligible account surface as errors.
    pub async fn execute(&self, email: &str) -> Result<&'static str, AuthServiceError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(GENERIC_RESET_MESSAGE);
        }

        let key = format!("forgot_password:{email}");
        match self.throttle.hit(&key, self.limit, self.window_secs).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("forgot-password throttled");
                return Ok(GENERIC_RESET_MESSAGE);
            }
            Err(e) => tracing::warn!(error = ?e, "forgot-password throttle unavailable"),
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Ok(GENERIC_RESET_MESSAGE);
        };
        if user.password_hash.is_none() {
            tracing::debug!(user_id = %user.id, "reset skipped for oauth-only account");
            return Ok(GENERIC_RESET_MESSAGE);
        }

        let raw_token = generate_reset_token();
        let expires_at = Utc::now() + self.reset_ttl;
        self.users
            .set_password_reset_token(user.id, &sha256_hex(&raw_token), expires_at)
            .await?;
        let link = reset_link(&self.frontend_url, &raw_token)?;
        tracing::info!(user_id = %user.id, "password reset ticket issued");

        notify_best_effort(
            "password_reset",
            self.notifier.send_password_reset_email(&user, link.as_str()),
        )
        .await;

        Ok(GENERIC_RESET_MESSAGE)
    }
}

// ── ResetPassword ────────────────────────────────────────────────────────────

pub struct ResetPasswordUseCase<U, S, N>
where
    U: UserRepository,
    S: SessionRepository,
    N: Notifier,
{
    pub users: U,
    pub registry: SessionRegistry<S>,
    pub notifier: N,
}

impl<U, S, N> ResetPasswordUseCase<U, S, N>
where
    U: UserRepository,
    S: SessionRepository,
    N: Notifier,
{
    /// Consume a reset ticket. Every session of the user is revoked.
    pub async fn execute(&self, raw_token: &str, new_password: &str) -> Result<(), AuthServiceError> {
        require_valid_new_password(new_password)?;
        let raw_token = raw_token.trim();
        if raw_token.is_empty() {
            return Err(AuthServiceError::InvalidResetToken);
        }

        let user = self
            .users
            .consume_password_reset_token(&sha256_hex(raw_token), Utc::now())
            .await?
            .ok_or(AuthServiceError::InvalidResetToken)?;

        let password_hash = hash_password(new_password).await?;
        self.users.update_password_hash(user.id, &password_hash).await?;
        let revoked = self.registry.revoke_all_sessions(user.id).await?;
        tracing::info!(user_id = %user.id, revoked, "password reset, all sessions revoked");

        notify_best_effort(
            "password_changed",
            self.notifier.send_password_changed_email(&user),
        )
        .await;
        Ok(())
    }
}

// ── ChangePassword ───────────────────────────────────────────────────────────

pub struct ChangePasswordInput {
    pub user_id: Uuid,
    pub current_password: String,
    pub new_password: String,
}

/// Authenticated password change. Existing sessions stay active.
pub struct ChangePasswordUseCase<U: UserRepository, N: Notifier> {
    pub users: U,
    pub notifier: N,
}

impl<U: UserRepository, N: Notifier> ChangePasswordUseCase<U, N> {
    pub async fn execute(&self, input: ChangePasswordInput) -> Result<(), AuthServiceError> {
        require_valid_new_password(&input.new_password)?;

        let user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        let Some(current_hash) = user.password_hash.as_deref() else {
            return Err(AuthServiceError::InvalidCurrentPassword);
        };
        if !verify_password(&input.current_password, current_hash).await? {
            return Err(AuthServiceError::InvalidCurrentPassword);
        }
        if input.current_password == input.new_password {
            return Err(AuthServiceError::PasswordUnchanged);
        }

        let password_hash = hash_password(&input.new_password).await?;
        self.users.update_password_hash(user.id, &password_hash).await?;
        tracing::info!(user_id = %user.id, "password changed");

        notify_best_effort(
            "password_changed",
            self.notifier.send_password_changed_email(&user),
        )
        .await;
        Ok(())
    }
}
