//! # Obligation API Handlers
//!
//! Payables and receivables share one resource; the direction travels in the
//! request body. Responses carry the runtime status next to the persisted one.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::access;
use crate::auth::IdentityHeaders;
use crate::error::ApiError;
use crate::handlers::types::{
    AsOfQuery, CancelRequest, CreateObligationRequest, CreatePlanRequest, ObligationView,
    ScopeQuery, today,
};
use crate::repositories::ObligationRepository;
use crate::repositories::obligation::{ObligationChanges, ObligationFilter, Reschedule, Settlement};
use crate::server::AppState;
use crate::tenant::Identity;

fn repository(state: &AppState) -> ObligationRepository<'_> {
    ObligationRepository::new(&state.db)
        .with_default_interval(state.config.ledger.default_installment_interval_days)
}

/// List obligations; `status` filters on the runtime status as of `as_of`
#[utoipa::path(
    get,
    path = "/api/v1/obligations",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery, ObligationFilter, AsOfQuery),
    responses(
        (status = 200, description = "Obligations ordered by due date", body = [ObligationView]),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Scope outside the caller's tenant", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn list_obligations(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    filter: Result<Query<ObligationFilter>, QueryRejection>,
    as_of: Result<Query<AsOfQuery>, QueryRejection>,
) -> Result<Json<Vec<ObligationView>>, ApiError> {
    let Query(scope) = scope?;
    let Query(filter) = filter?;
    let as_of = as_of?.0.date();
    let scope = access::resolve_scope(&identity, scope.requested()?)?;

    let obligations = repository(&state).list(&scope, filter, as_of).await?;
    Ok(Json(ObligationView::many(obligations, as_of)))
}

/// Create a single payable or receivable
#[utoipa::path(
    post,
    path = "/api/v1/obligations",
    security(("bearer_auth" = [])),
    params(IdentityHeaders),
    request_body = CreateObligationRequest,
    responses(
        (status = 201, description = "Obligation created", body = ObligationView),
        (status = 400, description = "Non-positive amount or inactive counterparty", body = ApiError),
        (status = 404, description = "Counterparty not found in the caller's tenant", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn create_obligation(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<CreateObligationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ObligationView>), ApiError> {
    let Json(request) = payload?;
    let obligation = repository(&state)
        .create_single(&identity, request.direction, request.obligation)
        .await?;
    Ok((StatusCode::CREATED, Json(ObligationView::at(obligation, today()))))
}

/// Create an installment plan; amounts sum exactly to the total
#[utoipa::path(
    post,
    path = "/api/v1/obligations/plans",
    security(("bearer_auth" = [])),
    params(IdentityHeaders),
    request_body = CreatePlanRequest,
    responses(
        (status = 201, description = "Installments ordered by index", body = [ObligationView]),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Counterparty not found in the caller's tenant", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn create_plan(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<CreatePlanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<ObligationView>>), ApiError> {
    let Json(request) = payload?;
    let installments = repository(&state)
        .create_installment_plan(&identity, request.direction, request.plan)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ObligationView::many(installments, today())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/obligations/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Obligation id"),
        IdentityHeaders,
        ScopeQuery,
        AsOfQuery
    ),
    responses(
        (status = 200, description = "Obligation", body = ObligationView),
        (status = 403, description = "Scope requires a superadmin", body = ApiError),
        (status = 404, description = "No such obligation in the requested scope", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn get_obligation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    as_of: Result<Query<AsOfQuery>, QueryRejection>,
) -> Result<Json<ObligationView>, ApiError> {
    let Query(scope) = scope?;
    let as_of = as_of?.0.date();
    let scope = access::resolve_scope(&identity, scope.requested()?)?;
    let obligation = repository(&state).get(&scope, id).await?;
    Ok(Json(ObligationView::at(obligation, as_of)))
}

/// Edit descriptive fields of an open obligation
#[utoipa::path(
    patch,
    path = "/api/v1/obligations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Obligation id"), IdentityHeaders),
    request_body = ObligationChanges,
    responses(
        (status = 200, description = "Updated obligation", body = ObligationView),
        (status = 409, description = "Obligation is settled or cancelled", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn update_obligation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<ObligationChanges>, JsonRejection>,
) -> Result<Json<ObligationView>, ApiError> {
    let Json(changes) = payload?;
    let obligation = repository(&state)
        .update_details(&identity, id, changes)
        .await?;
    Ok(Json(ObligationView::at(obligation, today())))
}

#[utoipa::path(
    post,
    path = "/api/v1/obligations/{id}/settle",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Obligation id"), IdentityHeaders),
    request_body = Settlement,
    responses(
        (status = 200, description = "Obligation settled", body = ObligationView),
        (status = 403, description = "Obligation belongs to another tenant", body = ApiError),
        (status = 404, description = "No such obligation", body = ApiError),
        (status = 409, description = "Already settled or cancelled", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn settle_obligation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<Settlement>, JsonRejection>,
) -> Result<Json<ObligationView>, ApiError> {
    let Json(settlement) = payload?;
    let obligation = repository(&state)
        .settle(&identity, id, settlement)
        .await?;
    Ok(Json(ObligationView::at(obligation, today())))
}

#[utoipa::path(
    post,
    path = "/api/v1/obligations/{id}/cancel",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Obligation id"), IdentityHeaders),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Obligation cancelled", body = ObligationView),
        (status = 400, description = "Empty motive", body = ApiError),
        (status = 409, description = "Already settled or cancelled", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn cancel_obligation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<ObligationView>, ApiError> {
    let Json(request) = payload?;
    let obligation = repository(&state)
        .cancel(&identity, id, &request.motive)
        .await?;
    Ok(Json(ObligationView::at(obligation, today())))
}

/// Reparcel one open obligation into a new installment group
#[utoipa::path(
    post,
    path = "/api/v1/obligations/{id}/split",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Obligation id"), IdentityHeaders),
    request_body = Reschedule,
    responses(
        (status = 201, description = "Replacement installments", body = [ObligationView]),
        (status = 409, description = "Obligation is settled or cancelled", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn split_obligation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<Reschedule>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<ObligationView>>), ApiError> {
    let Json(reschedule) = payload?;
    let installments = repository(&state)
        .split(&identity, id, reschedule)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ObligationView::many(installments, today())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/obligations/groups/{group_id}",
    security(("bearer_auth" = [])),
    params(("group_id" = Uuid, Path, description = "Installment group id"), IdentityHeaders, ScopeQuery, AsOfQuery),
    responses(
        (status = 200, description = "Siblings ordered by index", body = [ObligationView]),
        (status = 404, description = "No such group in scope", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn get_group(
    State(state): State<AppState>,
    identity: Identity,
    Path(group_id): Path<Uuid>,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    as_of: Result<Query<AsOfQuery>, QueryRejection>,
) -> Result<Json<Vec<ObligationView>>, ApiError> {
    let Query(scope) = scope?;
    let as_of = as_of?.0.date();
    let scope = access::resolve_scope(&identity, scope.requested()?)?;

    let siblings = repository(&state).group(&scope, group_id).await?;
    Ok(Json(ObligationView::many(siblings, as_of)))
}

/// Replace the open remainder of a group with a new installment structure
#[utoipa::path(
    post,
    path = "/api/v1/obligations/groups/{group_id}/reschedule",
    security(("bearer_auth" = [])),
    params(("group_id" = Uuid, Path, description = "Installment group id"), IdentityHeaders),
    request_body = Reschedule,
    responses(
        (status = 201, description = "Replacement installments", body = [ObligationView]),
        (status = 404, description = "No such group", body = ApiError),
        (status = 409, description = "Group has no open installments", body = ApiError)
    ),
    tag = "obligations"
)]
pub async fn reschedule_group(
    State(state): State<AppState>,
    identity: Identity,
    Path(group_id): Path<Uuid>,
    payload: Result<Json<Reschedule>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<ObligationView>>), ApiError> {
    let Json(reschedule) = payload?;
    let installments = repository(&state)
        .reschedule_group(&identity, group_id, reschedule)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ObligationView::many(installments, today())),
    ))
}
