//! # Repository Layer
//!
//! Storage-backed operations for parties, obligations, licenses and users.
//! Every read runs under a [`TenantScope`](crate::tenant::TenantScope) and
//! every write is checked by the [`access`](crate::access) policy first.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::error::LedgerError;

pub mod license;
pub mod obligation;
pub mod party;
pub mod user;

pub use license::LicenseRepository;
pub use obligation::ObligationRepository;
pub use party::PartyRepository;
pub use user::UserRepository;

/// Default page size for list operations.
pub const DEFAULT_LIMIT: u64 = 100;
/// Largest page a caller may request.
pub const MAX_LIMIT: u64 = 500;

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

pub(crate) fn page_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Trims `value` and rejects it when empty or longer than `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String, LedgerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(LedgerError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`] but blank input becomes `None`.
pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, LedgerError> {
    match value {
        Some(value) if !value.trim().is_empty() => required_text(field, &value, max).map(Some),
        _ => Ok(None),
    }
}
