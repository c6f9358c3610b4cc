//! Migration to create the licenses table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Licenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Licenses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Licenses::CompanyId).integer().not_null())
                    .col(ColumnDef::new(Licenses::BranchId).integer().not_null())
                    .col(ColumnDef::new(Licenses::LegalName).string_len(200).not_null())
                    .col(ColumnDef::new(Licenses::TaxId).string_len(18).not_null())
                    .col(ColumnDef::new(Licenses::LicenseKey).string_len(64).not_null())
                    .col(ColumnDef::new(Licenses::ValidFrom).date().not_null())
                    .col(ColumnDef::new(Licenses::ValidTo).date().not_null())
                    .col(
                        ColumnDef::new(Licenses::PaymentStatus)
                            .string_len(10)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Licenses::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Licenses::Notes).string_len(1000))
                    .col(
                        ColumnDef::new(Licenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Licenses::CreatedBy).integer())
                    .col(
                        ColumnDef::new(Licenses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Licenses::UpdatedBy).integer())
                    .check(
                        Expr::col(Licenses::ValidFrom).lte(Expr::col(Licenses::ValidTo)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-licenses-license_key")
                    .table(Licenses::Table)
                    .col(Licenses::LicenseKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-licenses-tenant")
                    .table(Licenses::Table)
                    .col(Licenses::CompanyId)
                    .col(Licenses::BranchId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx-licenses-tenant")
                    .table(Licenses::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx-licenses-license_key")
                    .table(Licenses::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Licenses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Licenses {
    Table,
    Id,
    CompanyId,
    BranchId,
    LegalName,
    TaxId,
    LicenseKey,
    ValidFrom,
    ValidTo,
    PaymentStatus,
    Active,
    Notes,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
}
