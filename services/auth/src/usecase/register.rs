use chrono::Utc;
use uuid::Uuid;

use shopdesk_domain::user::{UserRole, UserStatus};

use crate::domain::repository::{Notifier, SessionRepository, UserRepository};
use crate::domain::types::{
    AuthUser, SessionMeta, normalize_email, username_base, validate_email, validate_password,
    validate_username,
};
use crate::error::AuthServiceError;
use crate::usecase::crypto::{hash_password, username_suffix};
use crate::usecase::login::SignedIn;
use crate::usecase::notify_best_effort;
use crate::usecase::session::SessionRegistry;
use crate::usecase::token::TokenIssuer;

const USERNAME_ATTEMPTS: usize = 5;

/// `{base}_{nnnn}` not yet taken. Gives up after a few collisions.
pub(crate) async fn generate_username<U: UserRepository>(
    users: &U,
    name: Option<&str>,
    email: &str,
) -> Result<String, AuthServiceError> {
    let base = username_base(name, email);
    for _ in 0..USERNAME_ATTEMPTS {
        let candidate = format!("{base}_{}", username_suffix());
        if !users.exists_by_username(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(anyhow::anyhow!("no free username for base {base} after {USERNAME_ATTEMPTS} attempts").into())
}

pub(crate) fn require_valid_credentials(email: &str, password: &str) -> Result<(), AuthServiceError> {
    if !validate_email(email) {
        return Err(AuthServiceError::Validation("invalid email address".to_owned()));
    }
    if !validate_password(password) {
        return Err(AuthServiceError::Validation(
            "password must be 8 to 128 characters".to_owned(),
        ));
    }
    Ok(())
}

pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub meta: SessionMeta,
}

pub struct RegisterUseCase<U, S, N>
where
    U: UserRepository,
    S: SessionRepository,
    N: Notifier,
{
    pub users: U,
    pub registry: SessionRegistry<S>,
    pub issuer: TokenIssuer,
    pub notifier: N,
}

impl<U, S, N> RegisterUseCase<U, S, N>
where
    U: UserRepository,
    S: SessionRepository,
    N: Notifier,
{
    pub async fn execute(&self, input: RegisterInput) -> Result<SignedIn, AuthServiceError> {
        let email = normalize_email(&input.email);
        require_valid_credentials(&email, &input.password)?;
        let explicit_username = input
            .username
            .as_deref()
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty());
        if let Some(username) = explicit_username.as_deref() {
            if !validate_username(username) {
                return Err(AuthServiceError::Validation(
                    "username must be 3 to 30 characters of a-z, 0-9, '.' or '_'".to_owned(),
                ));
            }
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthServiceError::EmailTaken);
        }

        let username = match explicit_username {
            Some(username) => {
                if self.users.exists_by_username(&username).await? {
                    return Err(AuthServiceError::Validation(
                        "username already taken".to_owned(),
                    ));
                }
                username
            }
            None => generate_username(&self.users, input.first_name.as_deref(), &email).await?,
        };

        let password_hash = hash_password(&input.password).await?;
        let now = Utc::now();
        let user = AuthUser {
            id: Uuid::new_v4(),
            email,
            username,
            first_name: input.first_name,
            last_name: input.last_name,
            tenant_id: None,
            role: UserRole::for_self_registration(input.role),
            status: UserStatus::Active,
            password_hash: Some(password_hash),
            email_verified: false,
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
        };
        self.users.create(&user).await?;

        let issued = self.registry.open(&self.issuer, &user, &input.meta).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");

        notify_best_effort("welcome", self.notifier.send_welcome_email(&user)).await;

        Ok(SignedIn { user, issued })
    }
}
