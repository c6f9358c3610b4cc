//! # License API Handlers
//!
//! Mutations are superadmin-only; tenants may read their own licenses. A
//! superadmin listing without an explicit scope sees every tenant.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};

use crate::access;
use crate::auth::IdentityHeaders;
use crate::error::ApiError;
use crate::handlers::types::{AsOfQuery, RenewRequest, ScopeQuery, today};
use crate::models::license::Model as License;
use crate::repositories::LicenseRepository;
use crate::repositories::license::{IssueLicense, LicenseChanges, LicenseDashboard, LicenseFilter};
use crate::server::AppState;
use crate::tenant::{Identity, TenantScope};

fn repository(state: &AppState) -> LicenseRepository<'_> {
    LicenseRepository::with_config(&state.db, &state.config.license)
}

fn license_scope(identity: &Identity, scope: &ScopeQuery) -> Result<TenantScope, ApiError> {
    let requested = scope
        .requested()?
        .or_else(|| identity.is_superadmin.then_some(TenantScope::All));
    Ok(access::resolve_scope(identity, requested)?)
}

#[utoipa::path(
    get,
    path = "/api/v1/licenses",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery, LicenseFilter, AsOfQuery),
    responses(
        (status = 200, description = "Licenses, latest validity first", body = [License]),
        (status = 403, description = "Scope outside the caller's tenant", body = ApiError)
    ),
    tag = "licenses"
)]
pub async fn list_licenses(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    filter: Result<Query<LicenseFilter>, QueryRejection>,
    as_of: Result<Query<AsOfQuery>, QueryRejection>,
) -> Result<Json<Vec<License>>, ApiError> {
    let Query(scope) = scope?;
    let Query(filter) = filter?;
    let as_of = as_of?.0.date();
    let scope = license_scope(&identity, &scope)?;

    let licenses = repository(&state).list(&scope, filter, as_of).await?;
    Ok(Json(licenses))
}

/// Issue a license; the tenant must not hold an active, unexpired one
#[utoipa::path(
    post,
    path = "/api/v1/licenses",
    security(("bearer_auth" = [])),
    params(IdentityHeaders),
    request_body = IssueLicense,
    responses(
        (status = 201, description = "License issued", body = License),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Superadmin role required", body = ApiError),
        (status = 409, description = "Tenant already holds an active license", body = ApiError)
    ),
    tag = "licenses"
)]
pub async fn issue_license(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<IssueLicense>, JsonRejection>,
) -> Result<(StatusCode, Json<License>), ApiError> {
    let Json(request) = payload?;
    let license = repository(&state)
        .issue(&identity, request, today())
        .await?;
    Ok((StatusCode::CREATED, Json(license)))
}

#[utoipa::path(
    get,
    path = "/api/v1/licenses/dashboard",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery, AsOfQuery),
    responses(
        (status = 200, description = "License counters", body = LicenseDashboard)
    ),
    tag = "licenses"
)]
pub async fn license_dashboard(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    as_of: Result<Query<AsOfQuery>, QueryRejection>,
) -> Result<Json<LicenseDashboard>, ApiError> {
    let Query(scope) = scope?;
    let as_of = as_of?.0.date();
    let scope = license_scope(&identity, &scope)?;

    let dashboard = repository(&state).dashboard(&scope, as_of).await?;
    Ok(Json(dashboard))
}

#[utoipa::path(
    get,
    path = "/api/v1/licenses/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "License id"), IdentityHeaders),
    responses(
        (status = 200, description = "License", body = License),
        (status = 403, description = "License belongs to another tenant", body = ApiError),
        (status = 404, description = "No such license", body = ApiError)
    ),
    tag = "licenses"
)]
pub async fn get_license(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<Json<License>, ApiError> {
    let license = repository(&state).get(&identity, id).await?;
    Ok(Json(license))
}

#[utoipa::path(
    patch,
    path = "/api/v1/licenses/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "License id"), IdentityHeaders),
    request_body = LicenseChanges,
    responses(
        (status = 200, description = "Updated license", body = License),
        (status = 403, description = "Superadmin role required", body = ApiError),
        (status = 409, description = "Another license is already active", body = ApiError)
    ),
    tag = "licenses"
)]
pub async fn update_license(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<LicenseChanges>, JsonRejection>,
) -> Result<Json<License>, ApiError> {
    let Json(changes) = payload?;
    let license = repository(&state).update(&identity, id, changes).await?;
    Ok(Json(license))
}

#[utoipa::path(
    delete,
    path = "/api/v1/licenses/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "License id"), IdentityHeaders),
    responses(
        (status = 204, description = "License deleted"),
        (status = 403, description = "Superadmin role required", body = ApiError),
        (status = 404, description = "No such license", body = ApiError)
    ),
    tag = "licenses"
)]
pub async fn delete_license(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    repository(&state).delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Extend the validity window; the new end must be later than the current one
#[utoipa::path(
    post,
    path = "/api/v1/licenses/{id}/renew",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "License id"), IdentityHeaders),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Renewed license", body = License),
        (status = 400, description = "New end date does not advance", body = ApiError),
        (status = 403, description = "Superadmin role required", body = ApiError)
    ),
    tag = "licenses"
)]
pub async fn renew_license(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<RenewRequest>, JsonRejection>,
) -> Result<Json<License>, ApiError> {
    let Json(request) = payload?;
    let license = repository(&state)
        .renew(&identity, id, request.valid_to)
        .await?;
    Ok(Json(license))
}

#[utoipa::path(
    post,
    path = "/api/v1/licenses/{id}/activate",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "License id"), IdentityHeaders),
    responses(
        (status = 200, description = "License active", body = License),
        (status = 409, description = "Another license is already active", body = ApiError)
    ),
    tag = "licenses"
)]
pub async fn activate_license(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<Json<License>, ApiError> {
    let license = repository(&state).activate(&identity, id).await?;
    Ok(Json(license))
}

#[utoipa::path(
    post,
    path = "/api/v1/licenses/{id}/deactivate",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "License id"), IdentityHeaders),
    responses(
        (status = 200, description = "License inactive", body = License)
    ),
    tag = "licenses"
)]
pub async fn deactivate_license(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<Json<License>, ApiError> {
    let license = repository(&state).deactivate(&identity, id).await?;
    Ok(Json(license))
}
