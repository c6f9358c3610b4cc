//! # User Repository
//!
//! Tenant member directory. Authentication is external; this only tracks who
//! belongs to a tenant and which roles they hold.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::access;
use crate::error::LedgerError;
use crate::models::user::{
    ActiveModel as UserActiveModel, Column, Entity as User, Model as UserModel, UserStatus,
};
use crate::repositories::{now, optional_text, required_text};
use crate::tenant::{Identity, TenantId, TenantOwned, TenantScope};

/// Request data for adding a tenant member
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    /// Target tenant; defaults to the caller's. Only a superadmin may name
    /// another tenant.
    #[serde(default)]
    pub tenant: Option<TenantId>,
    #[schema(example = "maria")]
    pub login: String,
    #[schema(example = "Maria Souza")]
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub is_tenant_admin: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Add a member to a tenant. Superadmins are never created here.
    pub async fn create(&self, actor: &Identity, request: NewUser) -> Result<UserModel, LedgerError> {
        access::require_tenant_admin(actor)?;
        let tenant = request.tenant.unwrap_or(actor.tenant);
        access::ensure_same_tenant(actor, tenant)?;
        let login = required_text("login", &request.login, 50)?.to_lowercase();
        let name = required_text("name", &request.name, 100)?;
        let email = optional_text("email", request.email, 120)?;

        let taken = TenantScope::Tenant(tenant)
            .apply::<User, _>(User::find())
            .filter(Column::Login.eq(login.as_str()))
            .one(self.db)
            .await?;
        if let Some(existing) = taken {
            return Err(LedgerError::conflict(format!(
                "login {login} is already taken in tenant {tenant} (user {})",
                existing.id
            )));
        }

        let timestamp = now();
        let user = UserActiveModel {
            company_id: Set(tenant.company_id),
            branch_id: Set(tenant.branch_id),
            login: Set(login),
            name: Set(name),
            email: Set(email),
            status: Set(UserStatus::Active),
            is_superadmin: Set(false),
            is_tenant_admin: Set(request.is_tenant_admin),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        tracing::info!(tenant = %tenant, user_id = user.id, actor = actor.user_id, "User created");
        Ok(user)
    }

    /// Members visible in `scope`, ordered by tenant then login
    pub async fn list(&self, scope: &TenantScope) -> Result<Vec<UserModel>, LedgerError> {
        Ok(scope
            .apply::<User, _>(User::find())
            .order_by_asc(Column::CompanyId)
            .order_by_asc(Column::BranchId)
            .order_by_asc(Column::Login)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, actor: &Identity, id: i32) -> Result<UserModel, LedgerError> {
        let user = self.find(id).await?;
        access::ensure_same_tenant(actor, user.tenant())?;
        Ok(user)
    }

    pub async fn update(
        &self,
        actor: &Identity,
        id: i32,
        changes: UserChanges,
    ) -> Result<UserModel, LedgerError> {
        let user = self.load_mutable(actor, id).await?;

        let mut active = user.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(required_text("name", &name, 100)?);
        }
        if let Some(email) = changes.email {
            active.email = Set(optional_text("email", Some(email), 120)?);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        active.updated_at = Set(now());

        let user = active.update(self.db).await?;
        tracing::info!(user_id = id, actor = actor.user_id, "User updated");
        Ok(user)
    }

    /// Grant or revoke the tenant-admin role
    pub async fn set_admin(
        &self,
        actor: &Identity,
        id: i32,
        is_tenant_admin: bool,
    ) -> Result<UserModel, LedgerError> {
        let user = self.load_mutable(actor, id).await?;

        let mut active = user.into_active_model();
        active.is_tenant_admin = Set(is_tenant_admin);
        active.updated_at = Set(now());

        let user = active.update(self.db).await?;
        tracing::info!(
            user_id = id,
            actor = actor.user_id,
            is_tenant_admin,
            "User role changed"
        );
        Ok(user)
    }

    pub async fn delete(&self, actor: &Identity, id: i32) -> Result<(), LedgerError> {
        let user = self.load_mutable(actor, id).await?;
        if user.id == actor.user_id && user.tenant() == actor.tenant {
            return Err(LedgerError::validation("a user cannot delete itself"));
        }
        user.delete(self.db).await?;
        tracing::info!(user_id = id, actor = actor.user_id, "User deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<UserModel, LedgerError> {
        User::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("user {id} not found")))
    }

    async fn load_mutable(&self, actor: &Identity, id: i32) -> Result<UserModel, LedgerError> {
        let user = self.find(id).await?;
        access::ensure_can_mutate_user(actor, user.tenant(), user.is_superadmin)?;
        Ok(user)
    }
}
