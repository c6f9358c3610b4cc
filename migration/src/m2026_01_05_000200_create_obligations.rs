//! Migration to create the obligations table (payables and receivables)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const TENANT_INDEXES: &[(&str, Option<Obligations>)] = &[
    ("idx-obligations-tenant", None),
    ("idx-obligations-tenant-id", Some(Obligations::Id)),
    ("idx-obligations-tenant-counterparty", Some(Obligations::CounterpartyId)),
    ("idx-obligations-tenant-status", Some(Obligations::Status)),
    ("idx-obligations-tenant-due_date", Some(Obligations::DueDate)),
    ("idx-obligations-tenant-category", Some(Obligations::Category)),
    ("idx-obligations-tenant-group", Some(Obligations::InstallmentGroupId)),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Obligations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Obligations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Obligations::CompanyId).integer().not_null())
                    .col(ColumnDef::new(Obligations::BranchId).integer().not_null())
                    .col(ColumnDef::new(Obligations::Direction).string_len(12).not_null())
                    .col(ColumnDef::new(Obligations::CounterpartyId).integer().not_null())
                    .col(
                        ColumnDef::new(Obligations::Amount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Obligations::DueDate).date().not_null())
                    .col(ColumnDef::new(Obligations::SettledDate).date())
                    .col(
                        ColumnDef::new(Obligations::Status)
                            .string_len(12)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Obligations::Category).string_len(100))
                    .col(ColumnDef::new(Obligations::SettlementMethod).string_len(50))
                    .col(
                        ColumnDef::new(Obligations::InstallmentIndex)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Obligations::InstallmentCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Obligations::InstallmentGroupId).uuid())
                    .col(ColumnDef::new(Obligations::ParentObligationId).integer())
                    .col(ColumnDef::new(Obligations::Notes).string_len(1000))
                    .col(ColumnDef::new(Obligations::DocumentRef).string_len(50))
                    .col(ColumnDef::new(Obligations::CancelReason).string_len(1000))
                    .col(
                        ColumnDef::new(Obligations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Obligations::CreatedBy).integer())
                    .col(
                        ColumnDef::new(Obligations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Obligations::UpdatedBy).integer())
                    .check(Expr::col(Obligations::Amount).gt(0))
                    .check(Expr::col(Obligations::InstallmentIndex).gte(1))
                    .check(
                        Expr::col(Obligations::InstallmentIndex)
                            .lte(Expr::col(Obligations::InstallmentCount)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-obligations-counterparty_id")
                            .from(Obligations::Table, Obligations::CounterpartyId)
                            .to(Parties::Table, Parties::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-obligations-parent_obligation_id")
                            .from(Obligations::Table, Obligations::ParentObligationId)
                            .to(Obligations::Table, Obligations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in TENANT_INDEXES {
            let mut index = Index::create();
            index
                .name(*name)
                .table(Obligations::Table)
                .col(Obligations::CompanyId)
                .col(Obligations::BranchId);
            if let Some(column) = column {
                index.col(*column);
            }
            manager.create_index(index.to_owned()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, _) in TENANT_INDEXES.iter().rev() {
            manager
                .drop_index(
                    Index::drop()
                        .name(*name)
                        .table(Obligations::Table)
                        .to_owned(),
                )
                .await?;
        }
        manager
            .drop_table(Table::drop().table(Obligations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Obligations {
    Table,
    Id,
    CompanyId,
    BranchId,
    Direction,
    CounterpartyId,
    Amount,
    DueDate,
    SettledDate,
    Status,
    Category,
    SettlementMethod,
    InstallmentIndex,
    InstallmentCount,
    InstallmentGroupId,
    ParentObligationId,
    Notes,
    DocumentRef,
    CancelReason,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
}

#[derive(DeriveIden)]
enum Parties {
    Table,
    Id,
}
