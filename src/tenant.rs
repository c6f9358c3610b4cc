//! # Tenant Context
//!
//! Carries the verified caller identity and the tenant scope every storage
//! query passes through. Tenant-scoped entities implement [`TenantScoped`] so
//! that filtering by `(company_id, branch_id)` happens in exactly one place.

use std::fmt;

use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Isolation unit: one branch of one company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct TenantId {
    pub company_id: i32,
    pub branch_id: i32,
}

impl TenantId {
    pub fn new(company_id: i32, branch_id: i32) -> Self {
        Self {
            company_id,
            branch_id,
        }
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company_id, self.branch_id)
    }
}

/// Verified caller identity supplied by the authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub tenant: TenantId,
    pub is_superadmin: bool,
    pub is_tenant_admin: bool,
}

impl Identity {
    /// Regular tenant member.
    pub fn member(user_id: i32, tenant: TenantId) -> Self {
        Self {
            user_id,
            tenant,
            is_superadmin: false,
            is_tenant_admin: false,
        }
    }

    /// Tenant member holding the tenant-admin role.
    pub fn tenant_admin(user_id: i32, tenant: TenantId) -> Self {
        Self {
            is_tenant_admin: true,
            ..Self::member(user_id, tenant)
        }
    }

    /// Cross-tenant administrator.
    pub fn superadmin(user_id: i32, tenant: TenantId) -> Self {
        Self {
            is_superadmin: true,
            is_tenant_admin: true,
            ..Self::member(user_id, tenant)
        }
    }

    /// Scope of the caller's own tenant.
    pub fn own_scope(&self) -> TenantScope {
        TenantScope::Tenant(self.tenant)
    }
}

/// Which tenants a read may observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    Tenant(TenantId),
    /// Every tenant; only ever granted to a superadmin.
    All,
}

impl TenantScope {
    /// Returns true when a row owned by `tenant` is visible in this scope.
    pub fn contains(&self, tenant: TenantId) -> bool {
        match self {
            TenantScope::Tenant(own) => *own == tenant,
            TenantScope::All => true,
        }
    }

    /// Condition restricting `E` rows to this scope.
    pub fn condition<E: TenantScoped>(&self) -> Condition {
        match self {
            TenantScope::Tenant(tenant) => Condition::all()
                .add(E::company_column().eq(tenant.company_id))
                .add(E::branch_column().eq(tenant.branch_id)),
            TenantScope::All => Condition::all(),
        }
    }

    /// Applies the tenant filter to any filterable query over `E`.
    pub fn apply<E, Q>(&self, query: Q) -> Q
    where
        E: TenantScoped,
        Q: QueryFilter,
    {
        query.filter(self.condition::<E>())
    }
}

/// Entities that carry a `(company_id, branch_id)` tenant key.
pub trait TenantScoped: EntityTrait {
    fn company_column() -> Self::Column;
    fn branch_column() -> Self::Column;
}

/// Rows that expose their owning tenant.
pub trait TenantOwned {
    fn tenant(&self) -> TenantId;
}
