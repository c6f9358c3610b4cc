//! # Party API Handlers

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
use crate::handlers::types::ScopeQuery;
use crate::models::party::Model as Party;
use crate::repositories::PartyRepository;
use crate::repositories::party::{NewParty, PartyChanges, PartyFilter, PartyKindCount};
use crate::server::AppState;
use crate::tenant::Identity;

/// List parties visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/parties",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery, PartyFilter),
    responses(
        (status = 200, description = "Parties ordered by display name", body = [Party]),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Scope outside the caller's tenant", body = ApiError)
    ),
    tag = "parties"
)]
pub async fn list_parties(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
    filter: Result<Query<PartyFilter>, QueryRejection>,
) -> Result<Json<Vec<Party>>, ApiError> {
    let Query(scope) = scope?;
    let Query(filter) = filter?;
    let scope = access::resolve_scope(&identity, scope.requested()?)?;

    let parties = PartyRepository::new(&state.db).list(&scope, filter).await?;
    Ok(Json(parties))
}

/// Register a party in the caller's tenant
#[utoipa::path(
    post,
    path = "/api/v1/parties",
    security(("bearer_auth" = [])),
    params(IdentityHeaders),
    request_body = NewParty,
    responses(
        (status = 201, description = "Party created", body = Party),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 409, description = "Document already registered for this kind", body = ApiError)
    ),
    tag = "parties"
)]
pub async fn create_party(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<NewParty>, JsonRejection>,
) -> Result<(StatusCode, Json<Party>), ApiError> {
    let Json(request) = payload?;
    let party = PartyRepository::new(&state.db)
        .create(&identity, request)
        .await?;
    Ok((StatusCode::CREATED, Json(party)))
}

/// Active party counts per kind
#[utoipa::path(
    get,
    path = "/api/v1/parties/counts",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery),
    responses(
        (status = 200, description = "Active parties per kind", body = [PartyKindCount])
    ),
    tag = "parties"
)]
pub async fn party_counts(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
) -> Result<Json<Vec<PartyKindCount>>, ApiError> {
    let Query(scope) = scope?;
    let scope = access::resolve_scope(&identity, scope.requested()?)?;

    let counts = PartyRepository::new(&state.db)
        .counts_by_kind(&scope)
        .await?;
    Ok(Json(counts))
}

#[utoipa::path(
    get,
    path = "/api/v1/parties/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Party id"), IdentityHeaders, ScopeQuery),
    responses(
        (status = 200, description = "Party", body = Party),
        (status = 403, description = "Scope requires a superadmin", body = ApiError),
        (status = 404, description = "No such party in the requested scope", body = ApiError)
    ),
    tag = "parties"
)]
pub async fn get_party(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
) -> Result<Json<Party>, ApiError> {
    let Query(scope) = scope?;
    let scope = access::resolve_scope(&identity, scope.requested()?)?;
    let party = PartyRepository::new(&state.db).get(&scope, id).await?;
    Ok(Json(party))
}

#[utoipa::path(
    patch,
    path = "/api/v1/parties/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Party id"), IdentityHeaders),
    request_body = PartyChanges,
    responses(
        (status = 200, description = "Updated party", body = Party),
        (status = 403, description = "Party belongs to another tenant", body = ApiError),
        (status = 404, description = "No such party", body = ApiError),
        (status = 409, description = "Document already registered for this kind", body = ApiError)
    ),
    tag = "parties"
)]
pub async fn update_party(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<PartyChanges>, JsonRejection>,
) -> Result<Json<Party>, ApiError> {
    let Json(changes) = payload?;
    let party = PartyRepository::new(&state.db)
        .update(&identity, id, changes)
        .await?;
    Ok(Json(party))
}

#[utoipa::path(
    post,
    path = "/api/v1/parties/{id}/deactivate",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Party id"), IdentityHeaders),
    responses(
        (status = 200, description = "Party is now inactive", body = Party),
        (status = 404, description = "No such party", body = ApiError)
    ),
    tag = "parties"
)]
pub async fn deactivate_party(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<Json<Party>, ApiError> {
    let party = PartyRepository::new(&state.db)
        .deactivate(&identity, id)
        .await?;
    Ok(Json(party))
}

#[utoipa::path(
    delete,
    path = "/api/v1/parties/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Party id"), IdentityHeaders),
    responses(
        (status = 204, description = "Party deleted"),
        (status = 404, description = "No such party", body = ApiError),
        (status = 409, description = "Party is referenced by obligations", body = ApiError)
    ),
    tag = "parties"
)]
pub async fn delete_party(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    PartyRepository::new(&state.db)
        .delete(&identity, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
