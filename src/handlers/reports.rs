//! # Report API Handlers

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
};

use crate::access;
use crate::auth::IdentityHeaders;
use crate::error::ApiError;
use crate::handlers::types::{AsOfQuery, OverdueQuery, ScopeQuery};
use crate::reports::{CashFlowQuery, CashFlowReport, DashboardSummary, OverdueReport, ReportingEngine};
use crate::server::AppState;
use crate::tenant::Identity;

/// Cash flow for a due-date period
#[utoipa::path(
    get,
    path = "/api/v1/reports/cash-flow",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery, CashFlowQuery, AsOfQuery),
    responses(
        (status = 200, description = "Summary and line items ordered by due date", body = CashFlowReport),
        (status = 400, description = "period_start after period_end", body = ApiError),
        (status = 403, description = "Scope outside the caller's tenant", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn cash_flow(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    query: Result<Query<CashFlowQuery>, QueryRejection>,
    as_of: Result<Query<AsOfQuery>, QueryRejection>,
) -> Result<Json<CashFlowReport>, ApiError> {
    let Query(scope) = scope?;
    let Query(query) = query?;
    let as_of = as_of?.0.date();
    let scope = access::resolve_scope(&identity, scope.requested()?)?;

    let report = ReportingEngine::new(&state.db)
        .cash_flow(&scope, &query, as_of)
        .await?;
    Ok(Json(report))
}

/// Overdue obligations, most overdue first
#[utoipa::path(
    get,
    path = "/api/v1/reports/overdue",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery, OverdueQuery),
    responses(
        (status = 200, description = "Per-direction totals and items", body = OverdueReport),
        (status = 403, description = "Scope outside the caller's tenant", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn overdue(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    query: Result<Query<OverdueQuery>, QueryRejection>,
) -> Result<Json<OverdueReport>, ApiError> {
    let Query(scope) = scope?;
    let Query(query) = query?;
    let as_of = AsOfQuery { as_of: query.as_of }.date();
    let scope = access::resolve_scope(&identity, scope.requested()?)?;

    let report = ReportingEngine::new(&state.db)
        .overdue_report(&scope, query.max_days_overdue, as_of)
        .await?;
    Ok(Json(report))
}

/// Open and overdue totals per direction
#[utoipa::path(
    get,
    path = "/api/v1/reports/dashboard",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery, AsOfQuery),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 403, description = "Scope outside the caller's tenant", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    as_of: Result<Query<AsOfQuery>, QueryRejection>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let Query(scope) = scope?;
    let as_of = as_of?.0.date();
    let scope = access::resolve_scope(&identity, scope.requested()?)?;

    let summary = ReportingEngine::new(&state.db)
        .dashboard_summary(&scope, as_of)
        .await?;
    Ok(Json(summary))
}
