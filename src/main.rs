//! Recurring materialization run, meant to be invoked from cron.
//!
//! Usage: `ledger-sync [YYYY-MM-DD]`. Without a date the run uses today (UTC).

use chrono::{NaiveDate, Utc};
use dotenvy::dotenv;
use ledger_sync::{
    config::{
        database::{get_database_url, init_db},
        load_default_config,
    },
    core::recurring::{format_process_summary, owners_with_due_items, process_due},
    errors::{Error, Result},
};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn parse_as_of(arg: Option<String>) -> Result<NaiveDate> {
    match arg {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| Error::Validation {
            message: format!("as-of date '{raw}' is not YYYY-MM-DD: {e}"),
        }),
        None => Ok(Utc::now().date_naive()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Engine configuration
    let config = load_default_config()?;
    let as_of = parse_as_of(env::args().nth(1))?;

    // 4. Database
    let db = init_db(&get_database_url(config.database.url.as_deref()))
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Materialize everything due, owner by owner
    let options = config.materialize_options();
    let owners = owners_with_due_items(&db, as_of).await?;
    info!(%as_of, owners = owners.len(), "Starting recurring run");

    let mut failed_owners = 0usize;
    for owner_id in &owners {
        match process_due(&db, owner_id, as_of, &options).await {
            Ok(result) => {
                let summary = format_process_summary(owner_id, &result);
                if result.failures.is_empty() {
                    info!("{}", summary.trim_end());
                } else {
                    warn!("{}", summary.trim_end());
                }
            }
            Err(e) => {
                failed_owners += 1;
                error!(owner_id = %owner_id, "Recurring run failed: {}", e);
            }
        }
    }

    info!(owners = owners.len(), failed_owners, "Recurring run finished");
    Ok(())
}
