//! Migration: Create users table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Username).string().null())
                    .col(ColumnDef::new(Users::FirstName).string().null())
                    .col(ColumnDef::new(Users::LastName).string().null())
                    .col(ColumnDef::new(Users::PasswordHash).string().null())
                    .col(
                        ColumnDef::new(Users::Language)
                            .string_len(10)
                            .not_null()
                            .default("en"),
                    )
                    .col(ColumnDef::new(Users::Country).string().null())
                    .col(ColumnDef::new(Users::Timezone).string().null())
                    .col(
                        ColumnDef::new(Users::Confirmed)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::ConfirmationCode).string().null())
                    .col(ColumnDef::new(Users::AccessToken).string_len(64).not_null())
                    .col(ColumnDef::new(Users::AvailableSpace).big_integer().null())
                    .col(ColumnDef::new(Users::Permissions).json_binary().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Email,
    Username,
    FirstName,
    LastName,
    PasswordHash,
    Language,
    Country,
    Timezone,
    Confirmed,
    ConfirmationCode,
    AccessToken,
    AvailableSpace,
    Permissions,
    CreatedAt,
    UpdatedAt,
}
