//! Test utilities for database testing.
//!
//! In-memory SQLite with every migration applied, plus fixtures for tenants,
//! parties and licenses.

use anyhow::Result;
use bookkeeping::models::license::Model as License;
use bookkeeping::models::party::{Model as Party, PartyKind};
use bookkeeping::repositories::license::IssueLicense;
use bookkeeping::repositories::party::NewParty;
use bookkeeping::repositories::{LicenseRepository, PartyRepository};
use bookkeeping::tenant::{Identity, TenantId};
use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub const TENANT_A: TenantId = TenantId {
    company_id: 1,
    branch_id: 1,
};
#[allow(dead_code)]
pub const TENANT_B: TenantId = TenantId {
    company_id: 2,
    branch_id: 1,
};

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool holds a single connection, so concurrent callers queue on it the
/// same way they would on a row lock.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    Migrator::up(&db, None).await?;
    Ok(db)
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[allow(dead_code)]
pub fn member(tenant: TenantId) -> Identity {
    Identity::member(10, tenant)
}

#[allow(dead_code)]
pub fn admin(tenant: TenantId) -> Identity {
    Identity::tenant_admin(20, tenant)
}

#[allow(dead_code)]
pub fn root() -> Identity {
    Identity::superadmin(1, TenantId::new(99, 99))
}

#[allow(dead_code)]
pub fn new_party(name: &str, kind: PartyKind) -> NewParty {
    NewParty {
        display_name: name.to_string(),
        kind,
        document: None,
        address: None,
        city: None,
        state: None,
        postal_code: None,
        phone: None,
        mobile: None,
        email: None,
        notes: None,
    }
}

/// Registers a party in `identity`'s tenant.
#[allow(dead_code)]
pub async fn create_party(
    db: &DatabaseConnection,
    identity: &Identity,
    name: &str,
    kind: PartyKind,
) -> Result<Party> {
    Ok(PartyRepository::new(db)
        .create(identity, new_party(name, kind))
        .await?)
}

#[allow(dead_code)]
pub fn license_request(tenant: TenantId, valid_from: NaiveDate, valid_to: NaiveDate) -> IssueLicense {
    IssueLicense {
        company_id: tenant.company_id,
        branch_id: tenant.branch_id,
        legal_name: format!("Company {}", tenant.company_id),
        tax_id: format!("{:02}.345.678/0001-90", tenant.company_id),
        valid_from,
        valid_to,
        payment_status: None,
        notes: None,
    }
}

/// Issues a license as superadmin.
#[allow(dead_code)]
pub async fn issue_license(
    db: &DatabaseConnection,
    tenant: TenantId,
    valid_from: NaiveDate,
    valid_to: NaiveDate,
    today: NaiveDate,
) -> Result<License> {
    Ok(LicenseRepository::new(db)
        .issue(&root(), license_request(tenant, valid_from, valid_to), today)
        .await?)
}
