//! # Bookkeeping Ledger Library
//!
//! Multi-tenant accounts payable and receivable: tenant-scoped parties and
//! obligations with installment groups, a status lifecycle evaluated against
//! the calendar, cash-flow and overdue reporting, and a license registry that
//! gates tenant access.

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod license_key;
pub mod models;
pub mod reports;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub mod tenant;
pub use migration;
