//! Migration to create the parties table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Parties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parties::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Parties::CompanyId).integer().not_null())
                    .col(ColumnDef::new(Parties::BranchId).integer().not_null())
                    .col(ColumnDef::new(Parties::DisplayName).string_len(100).not_null())
                    .col(ColumnDef::new(Parties::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(Parties::Document).string_len(18))
                    .col(ColumnDef::new(Parties::Address).string_len(200))
                    .col(ColumnDef::new(Parties::City).string_len(100))
                    .col(ColumnDef::new(Parties::State).string_len(2))
                    .col(ColumnDef::new(Parties::PostalCode).string_len(10))
                    .col(ColumnDef::new(Parties::Phone).string_len(20))
                    .col(ColumnDef::new(Parties::Mobile).string_len(20))
                    .col(ColumnDef::new(Parties::Email).string_len(120))
                    .col(
                        ColumnDef::new(Parties::Status)
                            .string_len(10)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(ColumnDef::new(Parties::Notes).string_len(1000))
                    .col(
                        ColumnDef::new(Parties::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Parties::CreatedBy).integer())
                    .col(
                        ColumnDef::new(Parties::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Parties::UpdatedBy).integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parties-tenant")
                    .table(Parties::Table)
                    .col(Parties::CompanyId)
                    .col(Parties::BranchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parties-tenant-kind")
                    .table(Parties::Table)
                    .col(Parties::CompanyId)
                    .col(Parties::BranchId)
                    .col(Parties::Kind)
                    .to_owned(),
            )
            .await?;

        // NULL documents never collide, so unregistered parties may repeat.
        manager
            .create_index(
                Index::create()
                    .name("idx-parties-tenant-kind-document")
                    .table(Parties::Table)
                    .col(Parties::CompanyId)
                    .col(Parties::BranchId)
                    .col(Parties::Kind)
                    .col(Parties::Document)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx-parties-tenant-kind-document")
                    .table(Parties::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx-parties-tenant-kind")
                    .table(Parties::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx-parties-tenant")
                    .table(Parties::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Parties::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Parties {
    Table,
    Id,
    CompanyId,
    BranchId,
    DisplayName,
    Kind,
    Document,
    Address,
    City,
    State,
    PostalCode,
    Phone,
    Mobile,
    Email,
    Status,
    Notes,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
}
