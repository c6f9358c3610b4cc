//! Request and response shapes shared by the HTTP handlers.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::obligation::{Direction, Model as ObligationModel, ObligationStatus};
use crate::repositories::obligation::{NewInstallmentPlan, NewObligation};
use crate::tenant::{TenantId, TenantScope};

/// Optional tenant override for reads. Only a superadmin may point outside
/// their own tenant or ask for every tenant.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScopeQuery {
    pub company_id: Option<i32>,
    pub branch_id: Option<i32>,
    #[serde(default)]
    pub all_tenants: bool,
}

impl ScopeQuery {
    /// `None` when the caller did not ask for a specific scope
    pub fn requested(&self) -> Result<Option<TenantScope>, crate::error::LedgerError> {
        if self.all_tenants {
            return Ok(Some(TenantScope::All));
        }
        match (self.company_id, self.branch_id) {
            (None, None) => Ok(None),
            (Some(company_id), Some(branch_id)) => {
                Ok(Some(TenantScope::Tenant(TenantId::new(company_id, branch_id))))
            }
            _ => Err(crate::error::LedgerError::validation(
                "company_id and branch_id must be given together",
            )),
        }
    }
}

/// Evaluation date; defaults to today (UTC)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    pub fn date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(today)
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateObligationRequest {
    pub direction: Direction,
    #[serde(flatten)]
    pub obligation: NewObligation,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    pub direction: Direction,
    #[serde(flatten)]
    pub plan: NewInstallmentPlan,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CancelRequest {
    #[schema(example = "Duplicated invoice")]
    pub motive: String,
}

/// Obligation with the status it has on the evaluation date
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ObligationView {
    #[serde(flatten)]
    pub obligation: ObligationModel,
    pub runtime_status: ObligationStatus,
}

impl ObligationView {
    pub fn at(obligation: ObligationModel, as_of: NaiveDate) -> Self {
        Self {
            runtime_status: obligation.runtime_status(as_of),
            obligation,
        }
    }

    pub fn many(obligations: Vec<ObligationModel>, as_of: NaiveDate) -> Vec<Self> {
        obligations
            .into_iter()
            .map(|obligation| Self::at(obligation, as_of))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverdueQuery {
    pub max_days_overdue: Option<u32>,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RenewRequest {
    pub valid_to: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetAdminRequest {
    pub is_tenant_admin: bool,
}

/// Readiness probe body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: String,
}
