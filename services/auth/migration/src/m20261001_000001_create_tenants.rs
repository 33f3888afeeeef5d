use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenants::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tenants::Name).string().not_null())
                    .col(
                        ColumnDef::new(Tenants::TenantCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tenants::Plan).string().not_null())
                    .col(ColumnDef::new(Tenants::Status).string().not_null())
                    .col(ColumnDef::new(Tenants::Features).json_binary().not_null())
                    .col(ColumnDef::new(Tenants::MaxUsers).integer().not_null())
                    .col(
                        ColumnDef::new(Tenants::SubscriptionStartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tenants::SubscriptionEndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tenants::OwnerUserId).uuid())
                    .col(ColumnDef::new(Tenants::ContactEmail).string().not_null())
                    .col(
                        ColumnDef::new(Tenants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tenants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tenants {
    Table,
    Id,
    Name,
    TenantCode,
    Plan,
    Status,
    Features,
    MaxUsers,
    SubscriptionStartsAt,
    SubscriptionEndsAt,
    OwnerUserId,
    ContactEmail,
    CreatedAt,
    UpdatedAt,
}
