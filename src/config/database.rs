//! Database configuration module for the ledger engine.
//!
//! This module handles the store connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! models. On top of the generated tables it adds the unique index that makes
//! recurring materialization idempotent per due date.

use crate::entities::{
    DistributionTemplate, Goal, RecurringTransaction, TemplateAllocation, Transaction,
    TransactionColumn, Wallet,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Fallback location of the `SQLite` store when nothing else is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/ledger.sqlite?mode=rwc";

/// Name of the unique index guarding against double materialization.
pub const RECURRING_OCCURRENCE_INDEX: &str = "idx_transactions_recurring_occurrence";

/// Resolves the database URL.
///
/// `DATABASE_URL` from the environment wins over the configured value, which
/// in turn wins over [`DEFAULT_DATABASE_URL`].
#[must_use]
pub fn get_database_url(configured: Option<&str>) -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| configured.map(ToString::to_string))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the store at `database_url`.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to ledger store");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Parents are created before children so foreign keys resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_entity_table(db, &schema, Wallet).await?;
    create_entity_table(db, &schema, Transaction).await?;
    create_entity_table(db, &schema, RecurringTransaction).await?;
    create_entity_table(db, &schema, Goal).await?;
    create_entity_table(db, &schema, DistributionTemplate).await?;
    create_entity_table(db, &schema, TemplateAllocation).await?;

    // NULL recurring_id values never collide, so manual rows are unaffected.
    let occurrence_index = Index::create()
        .name(RECURRING_OCCURRENCE_INDEX)
        .table(Transaction)
        .col(TransactionColumn::RecurringId)
        .col(TransactionColumn::Date)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&occurrence_index)).await?;

    info!("Ledger tables ensured");
    Ok(())
}

async fn create_entity_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait + Copy,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }
    Ok(())
}

/// Creates the directory holding a file-backed `SQLite` store.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Connects to the store and makes sure the schema exists.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    ensure_sqlite_dir(database_url)?;
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{GoalModel, RecurringModel, TransactionModel, WalletModel};
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<WalletModel> = Wallet::find().limit(1).all(&db).await?;
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<RecurringModel> = RecurringTransaction::find().limit(1).all(&db).await?;
        let _: Vec<GoalModel> = Goal::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_ensure_sqlite_dir_ignores_memory_and_other_backends() -> Result<()> {
        ensure_sqlite_dir("sqlite::memory:")?;
        ensure_sqlite_dir("sqlite://:memory:")?;
        ensure_sqlite_dir("postgres://localhost/ledger")?;
        Ok(())
    }

    #[test]
    fn test_configured_url_used_without_env() {
        if std::env::var("DATABASE_URL").is_err() {
            assert_eq!(get_database_url(Some("sqlite::memory:")), "sqlite::memory:");
            assert_eq!(get_database_url(None), DEFAULT_DATABASE_URL);
        }
    }
}
