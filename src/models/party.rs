//! # Party Model
//!
//! People and organizations a tenant transacts with.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::tenant::{TenantId, TenantOwned, TenantScoped};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "parties")]
#[schema(as = Party)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub company_id: i32,
    pub branch_id: i32,

    pub display_name: String,
    pub kind: PartyKind,

    /// Tax id (CNPJ/CPF or equivalent); unique per tenant and kind when present
    pub document: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,

    pub status: PartyStatus,
    pub notes: Option<String>,

    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Option<i32>,
    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Option<i32>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyKind {
    #[sea_orm(string_value = "SUPPLIER")]
    Supplier,
    #[sea_orm(string_value = "CUSTOMER")]
    Customer,
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "OTHER")]
    Other,
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
pub enum PartyStatus {
    #[sea_orm(string_value = "ACTIVE")]
    #[default]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::obligation::Entity")]
    Obligations,
}

impl Related<super::obligation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obligations.def()
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
