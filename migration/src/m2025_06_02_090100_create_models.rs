//! Migration to create the models table.
//!
//! Each model row belongs to a provider and is identified by its globally
//! unique `api_string`. Rows are never deleted; retired models carry
//! `is_archived = true`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Models::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Models::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Models::ApiString).text().not_null())
                    .col(ColumnDef::new(Models::ProviderId).uuid().not_null())
                    .col(ColumnDef::new(Models::Name).text().not_null())
                    .col(
                        ColumnDef::new(Models::CostPerMillionTokenInput)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Models::CostPerMillionTokenOutput)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Models::Capabilities).json_binary().not_null())
                    .col(ColumnDef::new(Models::AvailableForChatApp).text().null())
                    .col(
                        ColumnDef::new(Models::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Models::ReleaseDate).date().null())
                    .col(
                        ColumnDef::new(Models::IsArchived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Models::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Models::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_models_provider_id")
                            .from(Models::Table, Models::ProviderId)
                            .to(Providers::Table, Providers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_models_api_string")
                    .table(Models::Table)
                    .col(Models::ApiString)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_models_provider_id")
                    .table(Models::Table)
                    .col(Models::ProviderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_models_api_string").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_models_provider_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Models::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Models {
    Table,
    Id,
    ApiString,
    ProviderId,
    Name,
    CostPerMillionTokenInput,
    CostPerMillionTokenOutput,
    Capabilities,
    AvailableForChatApp,
    Description,
    ReleaseDate,
    IsArchived,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Providers {
    Table,
    Id,
}
