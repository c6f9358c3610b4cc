//! # Access Policy
//!
//! Pure allow/deny decisions over a caller [`Identity`]. Nothing here touches
//! storage; repositories call these before reading or writing a row.

use crate::error::LedgerError;
use crate::tenant::{Identity, TenantId, TenantScope};

/// Same tenant unless the caller is a superadmin.
pub fn ensure_same_tenant(identity: &Identity, resource: TenantId) -> Result<(), LedgerError> {
    if identity.is_superadmin || identity.tenant == resource {
        Ok(())
    } else {
        Err(LedgerError::forbidden(format!(
            "resource belongs to another tenant ({resource})"
        )))
    }
}

/// Resolves the scope a read runs under.
///
/// `None` means the caller's own tenant. Requesting another tenant or every
/// tenant requires a superadmin.
pub fn resolve_scope(
    identity: &Identity,
    requested: Option<TenantScope>,
) -> Result<TenantScope, LedgerError> {
    match requested {
        None => Ok(identity.own_scope()),
        Some(TenantScope::Tenant(tenant)) => {
            ensure_same_tenant(identity, tenant)?;
            Ok(TenantScope::Tenant(tenant))
        }
        Some(TenantScope::All) if identity.is_superadmin => Ok(TenantScope::All),
        Some(TenantScope::All) => Err(LedgerError::forbidden(
            "only a superadmin may query all tenants",
        )),
    }
}

pub fn require_superadmin(identity: &Identity) -> Result<(), LedgerError> {
    if identity.is_superadmin {
        Ok(())
    } else {
        Err(LedgerError::forbidden("superadmin role required"))
    }
}

pub fn require_tenant_admin(identity: &Identity) -> Result<(), LedgerError> {
    if identity.is_tenant_admin || identity.is_superadmin {
        Ok(())
    } else {
        Err(LedgerError::forbidden("tenant admin role required"))
    }
}

/// User mutation: tenant admin, same tenant unless superadmin, and a
/// superadmin target may only be touched by another superadmin.
pub fn ensure_can_mutate_user(
    actor: &Identity,
    target_tenant: TenantId,
    target_is_superadmin: bool,
) -> Result<(), LedgerError> {
    require_tenant_admin(actor)?;
    ensure_same_tenant(actor, target_tenant)?;
    if target_is_superadmin && !actor.is_superadmin {
        return Err(LedgerError::forbidden(
            "only a superadmin may alter or delete a superadmin",
        ));
    }
    Ok(())
}
