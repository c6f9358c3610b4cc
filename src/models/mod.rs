//! # Data Models
//!
//! SeaORM entities for every tenant-scoped table.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod license;
pub mod obligation;
pub mod party;
pub mod user;

pub use license::Entity as License;
pub use obligation::Entity as Obligation;
pub use party::Entity as Party;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "bookkeeping".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
