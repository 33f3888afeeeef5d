use sea_orm::entity::prelude::*;

/// A retail business. Only the fields the bootstrap flow writes live here;
/// billing and plan management belong to other services.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub tenant_code: String,
    pub plan: String,
    pub status: String,
    /// Feature flags, e.g. `{"inventory": true, "loyalty": true}`.
    pub features: Json,
    pub max_users: i32,
    pub subscription_starts_at: chrono::DateTime<chrono::Utc>,
    pub subscription_ends_at: chrono::DateTime<chrono::Utc>,
    pub owner_user_id: Option<Uuid>,
    pub contact_email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
