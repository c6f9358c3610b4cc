//! # User Model
//!
//! Tenant members. Credentials live with the authenticator, not here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::tenant::{TenantId, TenantOwned, TenantScoped};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "users")]
#[schema(as = User)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub company_id: i32,
    pub branch_id: i32,

    /// Unique inside the tenant
    pub login: String,
    pub name: String,
    pub email: Option<String>,
    pub status: UserStatus,
    pub is_superadmin: bool,
    pub is_tenant_admin: bool,

    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2025-01-01T12:00:00Z")]
    pub updated_at: DateTimeWithTimeZone,
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
pub enum UserStatus {
    #[sea_orm(string_value = "ACTIVE")]
    #[default]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
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
