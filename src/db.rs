//! Connection pool setup and schema migration.
//!
//! Postgres in production, SQLite for local runs and tests. An in-memory
//! SQLite URL is pinned to a single connection since every new connection
//! would otherwise open an empty database.

use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tokio::time::sleep;

use crate::config::AppConfig;

const CONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: DbErr,
    },
    #[error("migration failed: {0}")]
    Migration(DbErr),
    #[error("invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Connect with exponential backoff between attempts.
///
/// ```no_run
/// use bookkeeping::{config::AppConfig, db::init_pool};
///
/// # async fn run() -> Result<(), bookkeeping::db::DatabaseError> {
/// let db = init_pool(&AppConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection, DatabaseError> {
    let options = connect_options(cfg)?;
    let mut retry_delay = Duration::from_millis(100);

    for attempt in 1..=CONNECT_ATTEMPTS {
        match Database::connect(options.clone()).await {
            Ok(conn) => {
                tracing::info!(
                    attempt,
                    backend = ?conn.get_database_backend(),
                    "Connected to database"
                );
                return Ok(conn);
            }
            Err(err) if attempt < CONNECT_ATTEMPTS => {
                tracing::warn!(
                    attempt,
                    error = %err,
                    retry_in_ms = retry_delay.as_millis() as u64,
                    "Database connection failed, retrying"
                );
                sleep(retry_delay).await;
                retry_delay *= 2;
            }
            Err(err) => {
                tracing::error!(attempts = CONNECT_ATTEMPTS, error = %err, "Giving up on database");
                return Err(err.into());
            }
        }
    }

    Err(DatabaseError::InvalidConfiguration {
        message: "no connection attempts were made".to_string(),
    })
}

pub fn connect_options(cfg: &AppConfig) -> Result<ConnectOptions, DatabaseError> {
    let url = cfg.database_url.trim();
    if url.is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "database URL cannot be empty".to_string(),
        });
    }

    let max_connections = if is_in_memory_sqlite(url) {
        1
    } else {
        cfg.db_max_connections.max(1)
    };

    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);
    Ok(options)
}

/// Apply every pending migration.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    Migrator::up(db, None).await.map_err(DatabaseError::Migration)?;
    tracing::info!("Database schema is up to date");
    Ok(())
}

/// Round-trips to the database; a disconnected handle is an error, not a panic.
pub async fn health_check(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.ping().await
}

fn is_in_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite") && (url.contains(":memory:") || url.contains("mode=memory"))
}
