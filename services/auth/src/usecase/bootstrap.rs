use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use shopdesk_domain::user::{UserRole, UserStatus};

use crate::domain::repository::{SessionRepository, TenantRepository, UserRepository};
use crate::domain::types::{
    AuthUser, SessionMeta, Tenant, activation_code_matches, derive_tenant_code, normalize_email,
};
use crate::error::AuthServiceError;
use crate::usecase::crypto::hash_password;
use crate::usecase::register::{generate_username, require_valid_credentials};
use crate::usecase::session::{IssuedSession, SessionRegistry};
use crate::usecase::token::TokenIssuer;

const DEFAULT_PLAN: &str = "enterprise";
const DEFAULT_MAX_USERS: i32 = 50;
const SUBSCRIPTION_DAYS: i64 = 365;
const DEFAULT_FEATURES: [&str; 8] = [
    "inventory",
    "sales",
    "purchasing",
    "loyalty",
    "appointments",
    "messaging",
    "returns",
    "reports",
];

fn default_features() -> serde_json::Value {
    let flags: serde_json::Map<String, serde_json::Value> = DEFAULT_FEATURES
        .iter()
        .map(|f| ((*f).to_owned(), json!(true)))
        .collect();
    serde_json::Value::Object(flags)
}

pub struct BootstrapInput {
    pub activation_code: String,
    pub tenant_name: String,
    pub tenant_code: Option<String>,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub meta: SessionMeta,
}

#[derive(Debug)]
pub struct BootstrapOutput {
    pub tenant: Tenant,
    pub user: AuthUser,
    pub issued: IssuedSession,
}

/// Provisions a tenant together with its first administrator.
pub struct BootstrapUseCase<U, T, S>
where
    U: UserRepository,
    T: TenantRepository,
    S: SessionRepository,
{
    pub users: U,
    pub tenants: T,
    pub registry: SessionRegistry<S>,
    pub issuer: TokenIssuer,
    pub activation_code: String,
}

impl<U, T, S> BootstrapUseCase<U, T, S>
where
    U: UserRepository,
    T: TenantRepository,
    S: SessionRepository,
{
    pub async fn execute(&self, input: BootstrapInput) -> Result<BootstrapOutput, AuthServiceError> {
        if !activation_code_matches(&input.activation_code, &self.activation_code) {
            return Err(AuthServiceError::InvalidActivationCode);
        }

        let email = normalize_email(&input.email);
        require_valid_credentials(&email, &input.password)?;
        let tenant_name = input.tenant_name.trim().to_owned();
        if tenant_name.is_empty() {
            return Err(AuthServiceError::Validation("tenant name is required".to_owned()));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthServiceError::EmailTaken);
        }
        let tenant_code = derive_tenant_code(input.tenant_code.as_deref(), &tenant_name);
        if self.tenants.find_by_tenant_code(&tenant_code).await?.is_some() {
            return Err(AuthServiceError::TenantCodeTaken);
        }

        let username = generate_username(&self.users, input.first_name.as_deref(), &email).await?;
        let password_hash = hash_password(&input.password).await?;

        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: tenant_name,
            tenant_code,
            plan: DEFAULT_PLAN.to_owned(),
            status: "active".to_owned(),
            features: default_features(),
            max_users: DEFAULT_MAX_USERS,
            subscription_starts_at: now,
            subscription_ends_at: now + Duration::days(SUBSCRIPTION_DAYS),
            owner_user_id: Some(user_id),
            contact_email: email.clone(),
            created_at: now,
            updated_at: now,
        };
        let user = AuthUser {
            id: user_id,
            email,
            username,
            first_name: input.first_name,
            last_name: input.last_name,
            tenant_id: Some(tenant.id),
            role: UserRole::Admin,
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
        self.tenants.create_with_owner(&tenant, &user).await?;
        tracing::info!(
            tenant_id = %tenant.id,
            tenant_code = %tenant.tenant_code,
            user_id = %user.id,
            "tenant bootstrapped"
        );

        let issued = self.registry.open(&self.issuer, &user, &input.meta).await?;

        Ok(BootstrapOutput {
            tenant,
            user,
            issued,
        })
    }
}
