//! Adds a partial unique index allowing at most one active license per tenant.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DatabaseBackend, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let sql = match backend {
            DatabaseBackend::Postgres => {
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_licenses_single_active \
                 ON licenses (company_id, branch_id) \
                 WHERE active"
            }
            _ => {
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_licenses_single_active \
                 ON licenses (company_id, branch_id) \
                 WHERE active = 1"
            }
        };

        manager
            .get_connection()
            .execute(Statement::from_string(backend, sql.to_string()))
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "DROP INDEX IF EXISTS idx_licenses_single_active",
            ))
            .await
            .map(|_| ())
    }
}
