//! # User API Handlers

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
use crate::handlers::types::{ScopeQuery, SetAdminRequest};
use crate::models::user::Model as User;
use crate::repositories::UserRepository;
use crate::repositories::user::{NewUser, UserChanges};
use crate::server::AppState;
use crate::tenant::Identity;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    security(("bearer_auth" = [])),
    params(IdentityHeaders, ScopeQuery),
    responses(
        (status = 200, description = "Members of the requested tenant(s)", body = [User]),
        (status = 403, description = "Scope requires a superadmin", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Query(scope) = scope?;
    let scope = access::resolve_scope(&identity, scope.requested()?)?;
    let users = UserRepository::new(&state.db).list(&scope).await?;
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    security(("bearer_auth" = [])),
    params(IdentityHeaders),
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Tenant admin role required", body = ApiError),
        (status = 409, description = "Login already taken", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(request) = payload?;
    let user = UserRepository::new(&state.db)
        .create(&identity, request)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id"), IdentityHeaders),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "User belongs to another tenant", body = ApiError),
        (status = 404, description = "No such user", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<Json<User>, ApiError> {
    let user = UserRepository::new(&state.db).get(&identity, id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id"), IdentityHeaders),
    request_body = UserChanges,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Not allowed to alter this user", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(changes) = payload?;
    let user = UserRepository::new(&state.db)
        .update(&identity, id, changes)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/admin",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id"), IdentityHeaders),
    request_body = SetAdminRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Not allowed to alter this user", body = ApiError)
    ),
    tag = "users"
)]
pub async fn set_user_admin(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    payload: Result<Json<SetAdminRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(request) = payload?;
    let user = UserRepository::new(&state.db)
        .set_admin(&identity, id, request.is_tenant_admin)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id"), IdentityHeaders),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not allowed to delete this user", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    UserRepository::new(&state.db)
        .delete(&identity, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
