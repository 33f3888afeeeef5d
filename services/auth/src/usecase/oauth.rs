use chrono::Utc;
use uuid::Uuid;

use shopdesk_domain::user::{UserRole, UserStatus};

use crate::domain::repository::{Notifier, OAuthProviderPort, SessionRepository, UserRepository};
use crate::domain::types::{AuthUser, OAuthProfile, SessionMeta, normalize_email};
use crate::error::AuthServiceError;
use crate::usecase::notify_best_effort;
use crate::usecase::register::generate_username;
use crate::usecase::session::{IssuedSession, SessionRegistry};
use crate::usecase::token::TokenIssuer;

pub struct OAuthLoginInput {
    pub provider: String,
    pub code: String,
    pub redirect_uri: String,
    pub meta: SessionMeta,
}

#[derive(Debug)]
pub struct OAuthLoginOutput {
    pub user: AuthUser,
    pub issued: IssuedSession,
    /// The account had never logged in before this call.
    pub is_new_user: bool,
}

pub struct OAuthLoginUseCase<U, S, N, P>
where
    U: UserRepository,
    S: SessionRepository,
    N: Notifier,
    P: OAuthProviderPort,
{
    pub users: U,
    pub registry: SessionRegistry<S>,
    pub issuer: TokenIssuer,
    pub notifier: N,
    pub providers: P,
}

impl<U, S, N, P> OAuthLoginUseCase<U, S, N, P>
where
    U: UserRepository,
    S: SessionRepository,
    N: Notifier,
    P: OAuthProviderPort,
{
    pub async fn execute(&self, input: OAuthLoginInput) -> Result<OAuthLoginOutput, AuthServiceError> {
        let profile = self
            .providers
            .fetch_profile(&input.provider, &input.code, &input.redirect_uri)
            .await?;
        self.login_with_profile(profile, &input.meta).await
    }

    /// Resolve a provider profile to a local account: existing link first,
    /// then an account with the same email (linked in place), else a new one.
    pub async fn login_with_profile(
        &self,
        profile: OAuthProfile,
        meta: &SessionMeta,
    ) -> Result<OAuthLoginOutput, AuthServiceError> {
        let email = normalize_email(&profile.email);
        if email.is_empty() || profile.provider_id.is_empty() {
            return Err(AuthServiceError::OAuthProfileIncomplete);
        }

        let (mut user, created) = match self
            .users
            .find_by_oauth_provider(&profile.provider, &profile.provider_id)
            .await?
        {
            Some(user) => (user, false),
            None => match self.users.find_by_email(&email).await? {
                Some(user) => (self.link(user, &profile).await?, false),
                None => (self.create(&profile, email).await?, true),
            },
        };

        if !user.status.is_active() {
            return Err(AuthServiceError::AccountDisabled);
        }

        let is_new_user = user.last_login_at.is_none();
        let now = Utc::now();
        self.users.update_last_login(user.id, now).await?;
        user.last_login_at = Some(now);

        let issued = self.registry.open(&self.issuer, &user, meta).await?;
        tracing::info!(
            user_id = %user.id,
            provider = %profile.provider,
            created,
            "oauth login succeeded"
        );

        if created {
            notify_best_effort(
                "oauth_welcome",
                self.notifier.send_oauth_welcome_email(&user, &profile.provider),
            )
            .await;
        }

        Ok(OAuthLoginOutput {
            user,
            issued,
            is_new_user,
        })
    }

    async fn link(
        &self,
        mut user: AuthUser,
        profile: &OAuthProfile,
    ) -> Result<AuthUser, AuthServiceError> {
        if let Some(previous) = user.oauth_provider.as_deref() {
            if previous != profile.provider {
                tracing::warn!(
                    user_id = %user.id,
                    previous_provider = previous,
                    provider = %profile.provider,
                    "replacing existing oauth link"
                );
            }
        }
        self.users
            .link_oauth_provider(
                user.id,
                &profile.provider,
                &profile.provider_id,
                profile.avatar_url.as_deref(),
            )
            .await?;
        user.oauth_provider = Some(profile.provider.clone());
        user.oauth_provider_id = Some(profile.provider_id.clone());
        if profile.avatar_url.is_some() {
            user.avatar_url = profile.avatar_url.clone();
        }
        tracing::info!(user_id = %user.id, provider = %profile.provider, "oauth provider linked");
        Ok(user)
    }

    async fn create(&self, profile: &OAuthProfile, email: String) -> Result<AuthUser, AuthServiceError> {
        let username =
            generate_username(&self.users, profile.first_name.as_deref(), &email).await?;
        let now = Utc::now();
        let user = AuthUser {
            id: Uuid::new_v4(),
            email,
            username,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            tenant_id: None,
            role: UserRole::Staff,
            status: UserStatus::Active,
            password_hash: None,
            email_verified: true,
            failed_login_attempts: 0,
            locked_until: None,
            oauth_provider: Some(profile.provider.clone()),
            oauth_provider_id: Some(profile.provider_id.clone()),
            avatar_url: profile.avatar_url.clone(),
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.create(&user).await?;
        Ok(user)
    }
}
