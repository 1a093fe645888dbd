//! Migration: Create tables hanging off a user.
//!
//! Social profiles, notifications and subscriptions reference `users`
//! with cascading deletes. File entries only carry an indexed owner id.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SocialProfiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SocialProfiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SocialProfiles::UserId).uuid().not_null())
                    .col(ColumnDef::new(SocialProfiles::ServiceName).string().not_null())
                    .col(ColumnDef::new(SocialProfiles::UserServiceId).string().not_null())
                    .col(
                        ColumnDef::new(SocialProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_social_profiles_user")
                            .from(SocialProfiles::Table, SocialProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notifications::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string().not_null())
                    .col(ColumnDef::new(Notifications::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(Notifications::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Subscriptions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Subscriptions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Subscriptions::Gateway).string().not_null())
                    .col(ColumnDef::new(Subscriptions::GatewayId).string().not_null())
                    .col(ColumnDef::new(Subscriptions::PlanId).uuid().null())
                    .col(
                        ColumnDef::new(Subscriptions::EndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CancelledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_user")
                            .from(Subscriptions::Table, Subscriptions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FileEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FileEntries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FileEntries::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(FileEntries::Name).string().not_null())
                    .col(ColumnDef::new(FileEntries::Path).string().not_null())
                    .col(
                        ColumnDef::new(FileEntries::Size)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FileEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_file_entries_owner_id")
                    .table(FileEntries::Table)
                    .col(FileEntries::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FileEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SocialProfiles::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum SocialProfiles {
    Table,
    Id,
    UserId,
    ServiceName,
    UserServiceId,
    CreatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Kind,
    Data,
    ReadAt,
    CreatedAt,
}

#[derive(Iden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    Gateway,
    GatewayId,
    PlanId,
    EndsAt,
    CancelledAt,
    CreatedAt,
}

#[derive(Iden)]
enum FileEntries {
    Table,
    Id,
    OwnerId,
    Name,
    Path,
    Size,
    CreatedAt,
}
