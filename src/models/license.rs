//! # License Model
//!
//! Time-windowed entitlement that lets a tenant operate.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::tenant::{TenantId, TenantOwned, TenantScoped};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "licenses")]
#[schema(as = License)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub company_id: i32,
    pub branch_id: i32,

    pub legal_name: String,
    pub tax_id: String,

    /// `XXXXXXXX-XXXXXXXX-XXXXXXXX-XXXXXXXX`, uppercase hex
    #[sea_orm(unique)]
    pub license_key: String,

    pub valid_from: Date,
    pub valid_to: Date,

    pub payment_status: PaymentStatus,
    pub active: bool,
    pub notes: Option<String>,

    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Option<i32>,
    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Option<i32>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    #[default]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "LATE")]
    Late,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TenantScoped for Entity {
    fn company_column() -> Column {
        Column::CompanyId
    }

    fn branch_column() -> Column {
        Column::BranchId
    }
}

impl TenantOwned for Model {
    fn tenant(&self) -> TenantId {
        TenantId::new(self.company_id, self.branch_id)
    }
}

impl Model {
    /// Active and `as_of` falls inside `[valid_from, valid_to]`.
    pub fn entitles(&self, as_of: Date) -> bool {
        self.active && self.valid_from <= as_of && as_of <= self.valid_to
    }

    pub fn is_expired(&self, as_of: Date) -> bool {
        self.valid_to < as_of
    }

    /// Counts against the one-active-license rule.
    pub fn blocks_issuance(&self, as_of: Date) -> bool {
        self.active && !self.is_expired(as_of)
    }
}
