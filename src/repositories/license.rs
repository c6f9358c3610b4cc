//! # License Repository
//!
//! Time-windowed tenant entitlements. Every mutation is superadmin-only.
//!
//! "At most one active license per tenant" is backed by a partial unique index
//! on `(company_id, branch_id) WHERE active`; issuance first retires expired
//! active rows so the index only ever rejects a genuine conflict.

use chrono::{Days, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::access;
use crate::config::LicenseConfig;
use crate::error::LedgerError;
use crate::license_key;
use crate::models::license::{
    ActiveModel as LicenseActiveModel, Column, Entity as License, Model as LicenseModel,
    PaymentStatus,
};
use crate::repositories::{now, optional_text, page_limit, required_text};
use crate::tenant::{Identity, TenantId, TenantOwned, TenantScope};

/// Request data for issuing a license
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IssueLicense {
    pub company_id: i32,
    pub branch_id: i32,
    #[schema(example = "Acme Comercio Ltda")]
    pub legal_name: String,
    #[schema(example = "12.345.678/0001-90")]
    pub tax_id: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

/// Free-form field update
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LicenseChanges {
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub payment_status: Option<PaymentStatus>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

/// List filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LicenseFilter {
    pub active: Option<bool>,
    pub payment_status: Option<PaymentStatus>,
    /// true: only `valid_to < today`; false: only `valid_to >= today`
    pub expired: Option<bool>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// License counters as of a date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LicenseDashboard {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    /// Active but past `valid_to`
    pub expired: u64,
    /// Active and ending within the warning window
    pub expiring_soon: u64,
    /// Active with payment PENDING or LATE
    pub pending_payment: u64,
}

/// Repository for License database operations
pub struct LicenseRepository<'a> {
    db: &'a DatabaseConnection,
    key_max_attempts: u32,
    expiry_warning_days: u32,
}

impl<'a> LicenseRepository<'a> {
    /// Create a new LicenseRepository with default settings
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self::with_config(db, &LicenseConfig::default())
    }

    pub fn with_config(db: &'a DatabaseConnection, config: &LicenseConfig) -> Self {
        Self {
            db,
            key_max_attempts: config.key_max_attempts.max(1),
            expiry_warning_days: config.expiry_warning_days,
        }
    }

    /// Issue a license for a tenant that holds no active, unexpired one.
    pub async fn issue(
        &self,
        identity: &Identity,
        request: IssueLicense,
        today: NaiveDate,
    ) -> Result<LicenseModel, LedgerError> {
        access::require_superadmin(identity)?;
        let tenant = TenantId::new(request.company_id, request.branch_id);
        let legal_name = required_text("legal_name", &request.legal_name, 200)?;
        let tax_id = required_text("tax_id", &request.tax_id, 18)?;
        validate_window(request.valid_from, request.valid_to)?;
        let notes = optional_text("notes", request.notes, 1000)?;

        let txn = self.db.begin().await?;

        let active = TenantScope::Tenant(tenant)
            .apply::<License, _>(License::find())
            .filter(Column::Active.eq(true))
            .lock_exclusive()
            .all(&txn)
            .await?;
        if let Some(blocking) = active.iter().find(|l| l.blocks_issuance(today)) {
            return Err(LedgerError::conflict(format!(
                "tenant {tenant} already holds active license {} valid until {}",
                blocking.id, blocking.valid_to
            )));
        }
        for expired in active {
            tracing::info!(tenant = %tenant, license_id = expired.id, "Retiring expired license");
            let mut retired = expired.into_active_model();
            retired.active = Set(false);
            retired.updated_at = Set(now());
            retired.updated_by = Set(Some(identity.user_id));
            retired.update(&txn).await?;
        }

        let license_key = self.unique_key(&txn, tenant, &tax_id).await?;
        let timestamp = now();
        let license = LicenseActiveModel {
            company_id: Set(tenant.company_id),
            branch_id: Set(tenant.branch_id),
            legal_name: Set(legal_name),
            tax_id: Set(tax_id),
            license_key: Set(license_key),
            valid_from: Set(request.valid_from),
            valid_to: Set(request.valid_to),
            payment_status: Set(request.payment_status.unwrap_or_default()),
            active: Set(true),
            notes: Set(notes),
            created_at: Set(timestamp),
            created_by: Set(Some(identity.user_id)),
            updated_at: Set(timestamp),
            updated_by: Set(Some(identity.user_id)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!(
            tenant = %tenant,
            license_id = license.id,
            valid_to = %license.valid_to,
            "License issued"
        );
        Ok(license)
    }

    /// Extend `valid_to`; the new date must be strictly later. Forces `active`.
    pub async fn renew(
        &self,
        identity: &Identity,
        id: i32,
        new_valid_to: NaiveDate,
    ) -> Result<LicenseModel, LedgerError> {
        access::require_superadmin(identity)?;

        let txn = self.db.begin().await?;
        let license = find(&txn, id).await?;
        if new_valid_to <= license.valid_to {
            return Err(LedgerError::validation(format!(
                "new valid_to {new_valid_to} must be after the current {}",
                license.valid_to
            )));
        }

        let mut active = license.into_active_model();
        active.valid_to = Set(new_valid_to);
        active.active = Set(true);
        active.updated_at = Set(now());
        active.updated_by = Set(Some(identity.user_id));
        let renewed = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(license_id = id, valid_to = %new_valid_to, "License renewed");
        Ok(renewed)
    }

    pub async fn activate(
        &self,
        identity: &Identity,
        id: i32,
    ) -> Result<LicenseModel, LedgerError> {
        self.set_active(identity, id, true).await
    }

    pub async fn deactivate(
        &self,
        identity: &Identity,
        id: i32,
    ) -> Result<LicenseModel, LedgerError> {
        self.set_active(identity, id, false).await
    }

    /// Free-form update of any field except the key and tenant
    pub async fn update(
        &self,
        identity: &Identity,
        id: i32,
        changes: LicenseChanges,
    ) -> Result<LicenseModel, LedgerError> {
        access::require_superadmin(identity)?;
        let license = find(self.db, id).await?;

        let valid_from = changes.valid_from.unwrap_or(license.valid_from);
        let valid_to = changes.valid_to.unwrap_or(license.valid_to);
        validate_window(valid_from, valid_to)?;

        let mut active = license.into_active_model();
        if let Some(name) = changes.legal_name {
            active.legal_name = Set(required_text("legal_name", &name, 200)?);
        }
        if let Some(tax_id) = changes.tax_id {
            active.tax_id = Set(required_text("tax_id", &tax_id, 18)?);
        }
        if let Some(status) = changes.payment_status {
            active.payment_status = Set(status);
        }
        if let Some(flag) = changes.active {
            active.active = Set(flag);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(optional_text("notes", Some(notes), 1000)?);
        }
        active.valid_from = Set(valid_from);
        active.valid_to = Set(valid_to);
        active.updated_at = Set(now());
        active.updated_by = Set(Some(identity.user_id));

        let updated = active.update(self.db).await?;
        tracing::info!(license_id = id, "License updated");
        Ok(updated)
    }

    pub async fn delete(&self, identity: &Identity, id: i32) -> Result<(), LedgerError> {
        access::require_superadmin(identity)?;
        let license = find(self.db, id).await?;
        let tenant = license.tenant();
        license.delete(self.db).await?;
        tracing::info!(tenant = %tenant, license_id = id, "License deleted");
        Ok(())
    }

    /// Visible to a superadmin or to the owning tenant
    pub async fn get(&self, identity: &Identity, id: i32) -> Result<LicenseModel, LedgerError> {
        let license = find(self.db, id).await?;
        access::ensure_same_tenant(identity, license.tenant())?;
        Ok(license)
    }

    /// Licenses ordered by `valid_to` descending
    pub async fn list(
        &self,
        scope: &TenantScope,
        filter: LicenseFilter,
        today: NaiveDate,
    ) -> Result<Vec<LicenseModel>, LedgerError> {
        let mut query = scope.apply::<License, _>(License::find());

        if let Some(active) = filter.active {
            query = query.filter(Column::Active.eq(active));
        }
        if let Some(status) = filter.payment_status {
            query = query.filter(Column::PaymentStatus.eq(status));
        }
        match filter.expired {
            Some(true) => query = query.filter(Column::ValidTo.lt(today)),
            Some(false) => query = query.filter(Column::ValidTo.gte(today)),
            None => {}
        }

        Ok(query
            .order_by_desc(Column::ValidTo)
            .order_by_desc(Column::Id)
            .offset(filter.offset.unwrap_or(0))
            .limit(page_limit(filter.limit))
            .all(self.db)
            .await?)
    }

    pub async fn dashboard(
        &self,
        scope: &TenantScope,
        today: NaiveDate,
    ) -> Result<LicenseDashboard, LedgerError> {
        let warning_end = today
            .checked_add_days(Days::new(u64::from(self.expiry_warning_days)))
            .unwrap_or(NaiveDate::MAX);
        let base = || scope.apply::<License, _>(License::find());

        let total = base().count(self.db).await?;
        let active = base()
            .filter(Column::Active.eq(true))
            .count(self.db)
            .await?;
        let expired = base()
            .filter(Column::Active.eq(true))
            .filter(Column::ValidTo.lt(today))
            .count(self.db)
            .await?;
        let expiring_soon = base()
            .filter(Column::Active.eq(true))
            .filter(Column::ValidTo.gte(today))
            .filter(Column::ValidTo.lte(warning_end))
            .count(self.db)
            .await?;
        let pending_payment = base()
            .filter(Column::Active.eq(true))
            .filter(Column::PaymentStatus.is_in([PaymentStatus::Pending, PaymentStatus::Late]))
            .count(self.db)
            .await?;

        Ok(LicenseDashboard {
            total,
            active,
            inactive: total - active,
            expired,
            expiring_soon,
            pending_payment,
        })
    }

    /// The license that entitles `tenant` on `today`, or `Forbidden`
    pub async fn check_entitlement(
        &self,
        tenant: TenantId,
        today: NaiveDate,
    ) -> Result<LicenseModel, LedgerError> {
        TenantScope::Tenant(tenant)
            .apply::<License, _>(License::find())
            .filter(Column::Active.eq(true))
            .filter(Column::ValidFrom.lte(today))
            .filter(Column::ValidTo.gte(today))
            .order_by_desc(Column::ValidTo)
            .one(self.db)
            .await?
            .ok_or_else(|| {
                LedgerError::forbidden(format!("tenant {tenant} has no valid license"))
            })
    }

    async fn set_active(
        &self,
        identity: &Identity,
        id: i32,
        flag: bool,
    ) -> Result<LicenseModel, LedgerError> {
        access::require_superadmin(identity)?;
        let license = find(self.db, id).await?;

        let mut active = license.into_active_model();
        active.active = Set(flag);
        active.updated_at = Set(now());
        active.updated_by = Set(Some(identity.user_id));
        let updated = active.update(self.db).await?;

        tracing::info!(license_id = id, active = flag, "License activation changed");
        Ok(updated)
    }

    async fn unique_key<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        tax_id: &str,
    ) -> Result<String, LedgerError> {
        for attempt in 1..=self.key_max_attempts {
            let candidate = license_key::generate(tenant, tax_id);
            let taken = License::find()
                .filter(Column::LicenseKey.eq(candidate.as_str()))
                .count(conn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
            tracing::warn!(attempt, "License key collision, regenerating");
        }
        Err(LedgerError::conflict(
            "could not generate a unique license key",
        ))
    }
}

async fn find<C: ConnectionTrait>(conn: &C, id: i32) -> Result<LicenseModel, LedgerError> {
    License::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("license {id} not found")))
}

fn validate_window(valid_from: NaiveDate, valid_to: NaiveDate) -> Result<(), LedgerError> {
    if valid_from > valid_to {
        return Err(LedgerError::validation(format!(
            "valid_from {valid_from} must not be after valid_to {valid_to}"
        )));
    }
    Ok(())
}
