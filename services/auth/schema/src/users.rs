use sea_orm::entity::prelude::*;

/// Credential record: identity, password hash, lockout counters, OAuth link and
/// the (single) live password-reset ticket.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub role: String,
    pub status: String,
    /// argon2id PHC string. `None` for OAuth-only accounts.
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<chrono::DateTime<chrono::Utc>>,
    pub oauth_provider: Option<String>,
    pub oauth_provider_id: Option<String>,
    pub avatar_url: Option<String>,
    /// SHA-256 hex of the raw reset token; set together with `password_reset_expires_at`.
    #[sea_orm(unique)]
    pub password_reset_token_hash: Option<String>,
    pub password_reset_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::TenantId",
        to = "super::tenants::Column::Id"
    )]
    Tenant,
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
