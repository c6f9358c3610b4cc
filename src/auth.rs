//! # Authentication and Authorization
//!
//! Credentials are checked upstream by a trusted gateway. Requests reach this
//! service carrying the gateway's bearer token and the verified caller in
//! identity headers; this module checks the token, turns the headers into an
//! [`Identity`] and, when enforcement is on, requires a valid tenant license.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::IntoParams;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized, validation_error};
use crate::repositories::LicenseRepository;
use crate::server::AppState;
use crate::tenant::{Identity, TenantId};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const COMPANY_ID_HEADER: &str = "X-Company-Id";
pub const BRANCH_ID_HEADER: &str = "X-Branch-Id";
pub const SUPERADMIN_HEADER: &str = "X-Superadmin";
pub const TENANT_ADMIN_HEADER: &str = "X-Tenant-Admin";

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Validates the gateway token and attaches the caller [`Identity`]
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    validate_token(&config, token)?;

    let identity = extract_identity(request.headers())?;
    tracing::debug!(
        user_id = identity.user_id,
        tenant = %identity.tenant,
        superadmin = identity.is_superadmin,
        "Authenticated request"
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Rejects tenant callers whose tenant holds no license valid today.
/// Superadmins pass through. Must run after [`auth_middleware`].
pub async fn license_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.license.enforcement {
        let identity = request
            .extensions()
            .get::<Identity>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Caller identity missing")))?;

        if !identity.is_superadmin {
            let today = Utc::now().date_naive();
            LicenseRepository::with_config(&state.db, &state.config.license)
                .check_entitlement(identity.tenant, today)
                .await
                .inspect_err(|_| {
                    tracing::warn!(tenant = %identity.tenant, "Request rejected: no valid license")
                })?;
        }
    }

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let is_valid = config
        .gateway_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

fn extract_identity(headers: &HeaderMap) -> Result<Identity, ApiError> {
    let user_id = required_int(headers, USER_ID_HEADER)?;
    let company_id = required_int(headers, COMPANY_ID_HEADER)?;
    let branch_id = required_int(headers, BRANCH_ID_HEADER)?;

    Ok(Identity {
        user_id,
        tenant: TenantId::new(company_id, branch_id),
        is_superadmin: optional_flag(headers, SUPERADMIN_HEADER)?,
        is_tenant_admin: optional_flag(headers, TENANT_ADMIN_HEADER)?,
    })
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Result<Option<&'h str>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value.to_str().map(str::trim).map_err(|_| {
                validation_error(
                    "Invalid identity header",
                    serde_json::json!({ name: "Header must be valid UTF-8" }),
                )
            })
        })
        .transpose()
}

fn required_int(headers: &HeaderMap, name: &str) -> Result<i32, ApiError> {
    let raw = header_str(headers, name)?.ok_or_else(|| {
        validation_error(
            "Missing required header",
            serde_json::json!({ name: "Required header is missing" }),
        )
    })?;

    match raw.parse::<i32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(validation_error(
            "Invalid identity header",
            serde_json::json!({ name: "Must be a positive integer" }),
        )),
    }
}

fn optional_flag(headers: &HeaderMap, name: &str) -> Result<bool, ApiError> {
    match header_str(headers, name)? {
        None => Ok(false),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            _ => Err(validation_error(
                "Invalid identity header",
                serde_json::json!({ name: "Must be true or false" }),
            )),
        },
    }
}

/// OpenAPI header parameters describing the caller
#[derive(Debug, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Header)]
pub struct IdentityHeaders {
    /// Verified caller user id
    #[serde(rename = "X-User-Id")]
    #[param(rename = "X-User-Id")]
    pub user_id: i32,
    /// Caller company
    #[serde(rename = "X-Company-Id")]
    #[param(rename = "X-Company-Id")]
    pub company_id: i32,
    /// Caller branch
    #[serde(rename = "X-Branch-Id")]
    #[param(rename = "X-Branch-Id")]
    pub branch_id: i32,
    #[serde(rename = "X-Superadmin")]
    #[param(rename = "X-Superadmin")]
    pub superadmin: Option<bool>,
    #[serde(rename = "X-Tenant-Admin")]
    #[param(rename = "X-Tenant-Admin")]
    pub tenant_admin: Option<bool>,
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Caller identity missing")))
    }
}
