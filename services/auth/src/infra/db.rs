use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use shopdesk_auth_schema::{outbox_events, sessions, tenants, users};
use shopdesk_domain::user::{UserRole, UserStatus};

use crate::domain::lockout::LockoutPolicy;
use crate::domain::repository::{
    FailedLogin, Notifier, SessionRepository, TenantRepository, UserRepository,
};
use crate::domain::session::sessions_to_evict;
use crate::domain::types::{AuthUser, OutboxEvent, Session, Tenant};
use crate::error::AuthServiceError;

/// Take a row lock on the user so per-user session mutations run one at a time.
async fn lock_user(txn: &DatabaseTransaction, user_id: Uuid) -> Result<(), DbErr> {
    users::Entity::find_by_id(user_id)
        .lock_exclusive()
        .one(txn)
        .await?;
    Ok(())
}

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_oauth_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<AuthUser>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::OauthProvider.eq(provider))
            .filter(users::Column::OauthProviderId.eq(provider_id))
            .one(&self.db)
            .await
            .context("find user by oauth provider")?;
        model.map(user_from_model).transpose()
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthServiceError> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.db)
            .await
            .context("count users by username")?;
        Ok(count > 0)
    }

    async fn create(&self, user: &AuthUser) -> Result<(), AuthServiceError> {
        insert_user(&self.db, user).await.context("create user")?;
        Ok(())
    }

    async fn update_last_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(id),
            last_login_at: Set(Some(at)),
            updated_at: Set(at),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update last login")?;
        Ok(())
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(id),
            password_hash: Set(Some(password_hash.to_owned())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update password hash")?;
        Ok(())
    }

    async fn increment_failed_login(
        &self,
        id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<FailedLogin, AuthServiceError> {
        let policy = *policy;
        let failed = self
            .db
            .transaction::<_, FailedLogin, DbErr>(|txn| {
                Box::pin(async move {
                    let model = users::Entity::find_by_id(id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or_else(|| DbErr::RecordNotFound(format!("user {id}")))?;
                    let now = Utc::now();
                    let previous = u32::try_from(model.failed_login_attempts).unwrap_or(0);
                    let (count, lock) = policy.next_after_failure(previous, now);

                    let mut active = users::ActiveModel {
                        id: Set(id),
                        failed_login_attempts: Set(i32::try_from(count).unwrap_or(i32::MAX)),
                        updated_at: Set(now),
                        ..Default::default()
                    };
                    if lock.is_some() {
                        active.locked_until = Set(lock);
                    }
                    active.update(txn).await?;

                    Ok(FailedLogin {
                        failed_attempts: count,
                        locked_until: lock,
                    })
                })
            })
            .await
            .context("increment failed login")?;
        Ok(failed)
    }

    async fn reset_failed_login(&self, id: Uuid) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(id),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("reset failed login")?;
        Ok(())
    }

    async fn set_password_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(id),
            password_reset_token_hash: Set(Some(token_hash.to_owned())),
            password_reset_expires_at: Set(Some(expires_at)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set password reset token")?;
        Ok(())
    }

    async fn consume_password_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthUser>, AuthServiceError> {
        let token_hash = token_hash.to_owned();
        let model = self
            .db
            .transaction::<_, Option<users::Model>, DbErr>(|txn| {
                Box::pin(async move {
                    let Some(model) = users::Entity::find()
                        .filter(users::Column::PasswordResetTokenHash.eq(token_hash.as_str()))
                        .filter(users::Column::PasswordResetExpiresAt.gt(now))
                        .lock_exclusive()
                        .one(txn)
                        .await?
                    else {
                        return Ok(None);
                    };

                    let cleared = users::Entity::update_many()
                        .col_expr(
                            users::Column::PasswordResetTokenHash,
                            Expr::value(Option::<String>::None),
                        )
                        .col_expr(
                            users::Column::PasswordResetExpiresAt,
                            Expr::value(Option::<DateTime<Utc>>::None),
                        )
                        .col_expr(users::Column::UpdatedAt, Expr::value(now))
                        .filter(users::Column::Id.eq(model.id))
                        .filter(users::Column::PasswordResetTokenHash.eq(token_hash.as_str()))
                        .exec(txn)
                        .await?;
                    Ok((cleared.rows_affected == 1).then_some(model))
                })
            })
            .await
            .context("consume password reset token")?;
        model.map(user_from_model).transpose()
    }

    async fn link_oauth_provider(
        &self,
        id: Uuid,
        provider: &str,
        provider_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<(), AuthServiceError> {
        let mut active = users::ActiveModel {
            id: Set(id),
            oauth_provider: Set(Some(provider.to_owned())),
            oauth_provider_id: Set(Some(provider_id.to_owned())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(url) = avatar_url {
            active.avatar_url = Set(Some(url.to_owned()));
        }
        active.update(&self.db).await.context("link oauth provider")?;
        Ok(())
    }
}

async fn insert_user<C: ConnectionTrait>(conn: &C, user: &AuthUser) -> Result<(), DbErr> {
    users::ActiveModel {
        id: Set(user.id),
        email: Set(user.email.clone()),
        username: Set(user.username.clone()),
        first_name: Set(user.first_name.clone()),
        last_name: Set(user.last_name.clone()),
        tenant_id: Set(user.tenant_id),
        role: Set(user.role.as_str().to_owned()),
        status: Set(user.status.as_str().to_owned()),
        password_hash: Set(user.password_hash.clone()),
        email_verified: Set(user.email_verified),
        failed_login_attempts: Set(i32::try_from(user.failed_login_attempts).unwrap_or(i32::MAX)),
        locked_until: Set(user.locked_until),
        oauth_provider: Set(user.oauth_provider.clone()),
        oauth_provider_id: Set(user.oauth_provider_id.clone()),
        avatar_url: Set(user.avatar_url.clone()),
        password_reset_token_hash: Set(user.password_reset_token_hash.clone()),
        password_reset_expires_at: Set(user.password_reset_expires_at),
        last_login_at: Set(user.last_login_at),
        created_at: Set(user.created_at),
        updated_at: Set(user.updated_at),
    }
    .insert(conn)
    .await?;
    Ok(())
}

fn user_from_model(model: users::Model) -> Result<AuthUser, AuthServiceError> {
    let role = model
        .role
        .parse::<UserRole>()
        .with_context(|| format!("user {} has unreadable role", model.id))?;
    Ok(AuthUser {
        id: model.id,
        email: model.email,
        username: model.username,
        first_name: model.first_name,
        last_name: model.last_name,
        tenant_id: model.tenant_id,
        role,
        status: UserStatus::from(model.status.as_str()),
        password_hash: model.password_hash,
        email_verified: model.email_verified,
        failed_login_attempts: u32::try_from(model.failed_login_attempts).unwrap_or(0),
        locked_until: model.locked_until,
        oauth_provider: model.oauth_provider,
        oauth_provider_id: model.oauth_provider_id,
        avatar_url: model.avatar_url,
        password_reset_token_hash: model.password_reset_token_hash,
        password_reset_expires_at: model.password_reset_expires_at,
        last_login_at: model.last_login_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Session repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

impl SessionRepository for DbSessionRepository {
    async fn create_with_cap(
        &self,
        session: &Session,
        cap: usize,
    ) -> Result<Vec<Uuid>, AuthServiceError> {
        let session = session.clone();
        let evicted = self
            .db
            .transaction::<_, Vec<Uuid>, DbErr>(|txn| {
                Box::pin(async move {
                    lock_user(txn, session.user_id).await?;

                    let active: Vec<Session> = sessions::Entity::find()
                        .filter(sessions::Column::UserId.eq(session.user_id))
                        .filter(sessions::Column::IsActive.eq(true))
                        .order_by_asc(sessions::Column::CreatedAt)
                        .order_by_asc(sessions::Column::Id)
                        .all(txn)
                        .await?
                        .into_iter()
                        .map(session_from_model)
                        .collect();
                    let evict = sessions_to_evict(&active, cap);
                    if !evict.is_empty() {
                        sessions::Entity::update_many()
                            .col_expr(sessions::Column::IsActive, Expr::value(false))
                            .col_expr(sessions::Column::UpdatedAt, Expr::value(session.created_at))
                            .filter(sessions::Column::Id.is_in(evict.clone()))
                            .exec(txn)
                            .await?;
                    }

                    insert_session(txn, &session).await?;
                    Ok(evict)
                })
            })
            .await
            .context("create session with cap")?;
        Ok(evicted)
    }

    async fn find_active_by_hash(
        &self,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Session>, AuthServiceError> {
        let model = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::RefreshTokenHash.eq(token_hash))
            .filter(sessions::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .context("find active session by hash")?;
        Ok(model.map(session_from_model))
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), AuthServiceError> {
        sessions::Entity::update_many()
            .col_expr(sessions::Column::IsActive, Expr::value(false))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sessions::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("deactivate session")?;
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
        let mut update = sessions::Entity::update_many()
            .col_expr(sessions::Column::RefreshTokenHash, Expr::value(new_hash.to_owned()))
            .col_expr(sessions::Column::LastActivity, Expr::value(at))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(at));
        if let Some(ip) = ip_address {
            update = update.col_expr(sessions::Column::IpAddress, Expr::value(ip.to_owned()));
        }
        let result = update
            .filter(sessions::Column::Id.eq(id))
            .filter(sessions::Column::IsActive.eq(true))
            .filter(sessions::Column::RefreshTokenHash.eq(expected_hash))
            .exec(&self.db)
            .await
            .context("rotate session refresh hash")?;
        Ok(result.rows_affected == 1)
    }

    async fn deactivate_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AuthServiceError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::IsActive, Expr::value(false))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sessions::Column::Id.eq(id))
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .context("deactivate session for user")?;
        Ok(result.rows_affected > 0)
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let revoked = self
            .db
            .transaction::<_, u64, DbErr>(|txn| {
                Box::pin(async move {
                    lock_user(txn, user_id).await?;
                    let result = sessions::Entity::update_many()
                        .col_expr(sessions::Column::IsActive, Expr::value(false))
                        .col_expr(sessions::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(sessions::Column::UserId.eq(user_id))
                        .filter(sessions::Column::IsActive.eq(true))
                        .exec(txn)
                        .await?;
                    Ok(result.rows_affected)
                })
            })
            .await
            .context("deactivate all sessions for user")?;
        Ok(revoked)
    }

    async fn deactivate_others_for_user(
        &self,
        user_id: Uuid,
        keep_id: Uuid,
    ) -> Result<u64, AuthServiceError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::IsActive, Expr::value(false))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::Id.ne(keep_id))
            .filter(sessions::Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .context("deactivate other sessions for user")?;
        Ok(result.rows_affected)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::IsActive, Expr::value(false))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::IsActive.eq(true))
            .filter(sessions::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .context("deactivate expired sessions")?;
        Ok(result.rows_affected)
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError> {
        let models = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::IsActive.eq(true))
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .order_by_desc(sessions::Column::LastActivity)
            .all(&self.db)
            .await
            .context("list active sessions")?;
        Ok(models.into_iter().map(session_from_model).collect())
    }
}

async fn insert_session(txn: &DatabaseTransaction, session: &Session) -> Result<(), DbErr> {
    sessions::ActiveModel {
        id: Set(session.id),
        user_id: Set(session.user_id),
        tenant_id: Set(session.tenant_id),
        refresh_token_hash: Set(session.refresh_token_hash.clone()),
        device_info: Set(session.device_info.clone()),
        ip_address: Set(session.ip_address.clone()),
        user_agent: Set(session.user_agent.clone()),
        is_active: Set(session.is_active),
        last_activity: Set(session.last_activity),
        expires_at: Set(session.expires_at),
        created_at: Set(session.created_at),
        updated_at: Set(session.updated_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn session_from_model(model: sessions::Model) -> Session {
    Session {
        id: model.id,
        user_id: model.user_id,
        tenant_id: model.tenant_id,
        refresh_token_hash: model.refresh_token_hash,
        device_info: model.device_info,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        is_active: model.is_active,
        last_activity: model.last_activity,
        expires_at: model.expires_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Tenant repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbTenantRepository {
    pub db: DatabaseConnection,
}

impl TenantRepository for DbTenantRepository {
    async fn find_by_tenant_code(&self, code: &str) -> Result<Option<Tenant>, AuthServiceError> {
        let model = tenants::Entity::find()
            .filter(tenants::Column::TenantCode.eq(code))
            .one(&self.db)
            .await
            .context("find tenant by code")?;
        Ok(model.map(tenant_from_model))
    }

    async fn create_with_owner(
        &self,
        tenant: &Tenant,
        owner: &AuthUser,
    ) -> Result<(), AuthServiceError> {
        let tenant = tenant.clone();
        let owner = owner.clone();
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    tenants::ActiveModel {
                        id: Set(tenant.id),
                        name: Set(tenant.name.clone()),
                        tenant_code: Set(tenant.tenant_code.clone()),
                        plan: Set(tenant.plan.clone()),
                        status: Set(tenant.status.clone()),
                        features: Set(tenant.features.clone()),
                        max_users: Set(tenant.max_users),
                        subscription_starts_at: Set(tenant.subscription_starts_at),
                        subscription_ends_at: Set(tenant.subscription_ends_at),
                        owner_user_id: Set(None),
                        contact_email: Set(tenant.contact_email.clone()),
                        created_at: Set(tenant.created_at),
                        updated_at: Set(tenant.updated_at),
                    }
                    .insert(txn)
                    .await?;

                    insert_user(txn, &owner).await?;

                    tenants::ActiveModel {
                        id: Set(tenant.id),
                        owner_user_id: Set(Some(owner.id)),
                        ..Default::default()
                    }
                    .update(txn)
                    .await?;
                    Ok(())
                })
            })
            .await
            .context("create tenant with owner")?;
        Ok(())
    }
}

fn tenant_from_model(model: tenants::Model) -> Tenant {
    Tenant {
        id: model.id,
        name: model.name,
        tenant_code: model.tenant_code,
        plan: model.plan,
        status: model.status,
        features: model.features,
        max_users: model.max_users,
        subscription_starts_at: model.subscription_starts_at,
        subscription_ends_at: model.subscription_ends_at,
        owner_user_id: model.owner_user_id,
        contact_email: model.contact_email,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Outbox notifier ──────────────────────────────────────────────────────────

pub const WELCOME_EMAIL: &str = "welcome_email";
pub const PASSWORD_RESET_EMAIL: &str = "password_reset_email";
pub const OAUTH_WELCOME_EMAIL: &str = "oauth_welcome_email";
pub const PASSWORD_CHANGED_EMAIL: &str = "password_changed_email";

/// Writes account emails to the outbox; an external mailer delivers them.
#[derive(Clone)]
pub struct OutboxNotifier {
    pub db: DatabaseConnection,
}

impl OutboxNotifier {
    async fn enqueue(
        &self,
        kind: &str,
        user: &AuthUser,
        extra: serde_json::Value,
    ) -> Result<(), AuthServiceError> {
        let mut payload = json!({
            "email": user.email,
            "name": user.display_name(),
        });
        if let (Some(base), serde_json::Value::Object(extra)) = (payload.as_object_mut(), extra) {
            base.extend(extra);
        }
        let id = Uuid::new_v4();
        let event = OutboxEvent {
            id,
            kind: kind.to_owned(),
            user_id: Some(user.id),
            payload,
            idempotency_key: format!("{kind}:{id}"),
        };
        insert_outbox_event(&self.db, &event)
            .await
            .with_context(|| format!("enqueue {kind}"))?;
        Ok(())
    }
}

impl Notifier for OutboxNotifier {
    async fn send_welcome_email(&self, user: &AuthUser) -> Result<(), AuthServiceError> {
        self.enqueue(WELCOME_EMAIL, user, json!({ "username": user.username }))
            .await
    }

    async fn send_password_reset_email(
        &self,
        user: &AuthUser,
        reset_link: &str,
    ) -> Result<(), AuthServiceError> {
        self.enqueue(PASSWORD_RESET_EMAIL, user, json!({ "reset_link": reset_link }))
            .await
    }

    async fn send_oauth_welcome_email(
        &self,
        user: &AuthUser,
        provider: &str,
    ) -> Result<(), AuthServiceError> {
        self.enqueue(OAUTH_WELCOME_EMAIL, user, json!({ "provider": provider }))
            .await
    }

    async fn send_password_changed_email(&self, user: &AuthUser) -> Result<(), AuthServiceError> {
        self.enqueue(PASSWORD_CHANGED_EMAIL, user, json!({})).await
    }
}

async fn insert_outbox_event<C: ConnectionTrait>(
    conn: &C,
    event: &OutboxEvent,
) -> Result<(), DbErr> {
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        user_id: Set(event.user_id),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(conn)
    .await?;
    Ok(())
}
