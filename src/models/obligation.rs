//! # Obligation Model
//!
//! One row per payable or receivable. Installment siblings share an
//! `installment_group_id`; rows produced by a split point back to the
//! originating obligation through `parent_obligation_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger;
use crate::tenant::{TenantId, TenantOwned, TenantScoped};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "obligations")]
#[schema(as = Obligation)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub company_id: i32,
    pub branch_id: i32,

    pub direction: Direction,

    /// Party the money is owed to (payable) or by (receivable)
    pub counterparty_id: i32,

    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    #[schema(value_type = String, example = "150.00")]
    pub amount: Decimal,

    pub due_date: Date,
    pub settled_date: Option<Date>,

    /// Persisted status; may lag behind the calendar, see [`Model::runtime_status`]
    pub status: ObligationStatus,

    pub category: Option<String>,
    pub settlement_method: Option<String>,

    /// 1-based position inside the installment group
    pub installment_index: i32,
    pub installment_count: i32,
    pub installment_group_id: Option<Uuid>,
    pub parent_obligation_id: Option<i32>,

    pub notes: Option<String>,
    pub document_ref: Option<String>,
    pub cancel_reason: Option<String>,

    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Option<i32>,
    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Option<i32>,
}

/// Which side of the books an obligation sits on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[sea_orm(string_value = "PAYABLE")]
    Payable,
    #[sea_orm(string_value = "RECEIVABLE")]
    Receivable,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationStatus {
    #[sea_orm(string_value = "PENDING")]
    #[default]
    Pending,
    #[sea_orm(string_value = "SETTLED")]
    Settled,
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl ObligationStatus {
    /// Unsettled and uncancelled.
    pub fn is_open(self) -> bool {
        matches!(self, ObligationStatus::Pending | ObligationStatus::Overdue)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ObligationStatus::Settled | ObligationStatus::Cancelled)
    }

    pub const OPEN: [ObligationStatus; 2] = [ObligationStatus::Pending, ObligationStatus::Overdue];
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::party::Entity",
        from = "Column::CounterpartyId",
        to = "super::party::Column::Id"
    )]
    Counterparty,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentObligationId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Parent,
}

impl Related<super::party::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Counterparty.def()
    }
}

/// Child installment to the obligation it was split or rescheduled from.
pub struct ParentLink;

impl Linked for ParentLink {
    type FromEntity = Entity;
    type ToEntity = Entity;

    fn link(&self) -> Vec<RelationDef> {
        vec![Relation::Parent.def()]
    }
}

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
    /// Authoritative status as of `as_of`.
    pub fn runtime_status(&self, as_of: Date) -> ObligationStatus {
        ledger::derive_runtime_status(self.status, self.due_date, as_of)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
