//! # Bookkeeping Ledger Entry Point
//!
//! `serve` (the default) migrates and starts the HTTP API, `migrate` only
//! applies migrations and `refresh-overdue` persists PENDING -> OVERDUE for
//! every tenant as of a date.

use std::sync::Arc;

use anyhow::Context;
use bookkeeping::{
    config::ConfigLoader,
    db,
    repositories::ObligationRepository,
    server::run_server,
    telemetry,
    tenant::TenantScope,
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookkeeping")]
#[command(version, about = "Multi-tenant accounts payable and receivable ledger")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and serve the HTTP API
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Persist OVERDUE on unsettled obligations due before the given date
    RefreshOverdue {
        /// Evaluation date (YYYY-MM-DD); defaults to today in UTC
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            db::run_migrations(&db).await?;
            run_server(Arc::new(config), db).await
        }
        Commands::Migrate => {
            db::run_migrations(&db).await?;
            Ok(())
        }
        Commands::RefreshOverdue { as_of } => {
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let touched = ObligationRepository::new(&db)
                .refresh_overdue(&TenantScope::All, as_of)
                .await
                .context("refreshing overdue statuses")?;
            tracing::info!(%as_of, touched, "Overdue refresh finished");
            Ok(())
        }
    }
}
