//! Database migrations for the bookkeeping service.
//!
//! Parties, obligations, licenses and tenant users, plus the storage-level
//! guard that keeps a single active license per tenant.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_000100_create_parties;
mod m2026_01_05_000200_create_obligations;
mod m2026_01_05_000300_create_licenses;
mod m2026_01_05_000400_create_users;
mod m2026_01_06_000100_add_license_single_active_guard;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_000100_create_parties::Migration),
            Box::new(m2026_01_05_000200_create_obligations::Migration),
            Box::new(m2026_01_05_000300_create_licenses::Migration),
            Box::new(m2026_01_05_000400_create_users::Migration),
            Box::new(m2026_01_06_000100_add_license_single_active_guard::Migration),
        ]
    }
}
