//! Shared test utilities for the ledger engine.
//!
//! Helpers for setting up an in-memory database and creating entities with
//! sensible defaults. All of them act as [`TEST_OWNER`].

use crate::{
    core::{
        goal::{self, NewGoal},
        transaction::{self, NewTransaction},
        wallet::{self, NewWallet},
    },
    entities::{self, Goal, TransactionType, Wallet, WalletType},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Owner id used by every helper.
pub const TEST_OWNER: &str = "test-owner";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a cash wallet with a zero opening balance.
pub async fn create_test_wallet(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::wallet::Model> {
    create_custom_wallet(db, name, Decimal::ZERO).await
}

/// Creates a cash wallet with the given opening balance.
pub async fn create_custom_wallet(
    db: &DatabaseConnection,
    name: &str,
    initial_balance: Decimal,
) -> Result<entities::wallet::Model> {
    wallet::create_wallet(
        db,
        TEST_OWNER,
        NewWallet {
            name: name.to_string(),
            wallet_type: WalletType::Cash,
            initial_balance,
            currency: "IDR".to_string(),
            icon: None,
        },
    )
    .await
}

/// Sets up a test database with one empty wallet.
/// Returns (db, wallet) for convenience.
pub async fn setup_with_wallet() -> Result<(DatabaseConnection, entities::wallet::Model)> {
    let db = setup_test_db().await?;
    let wallet = create_test_wallet(&db, "Main").await?;
    Ok((db, wallet))
}

/// Creates a goal that mirrors `wallet_id`.
pub async fn create_linked_goal(
    db: &DatabaseConnection,
    name: &str,
    target_amount: Decimal,
    wallet_id: i64,
) -> Result<entities::goal::Model> {
    goal::create_goal(
        db,
        TEST_OWNER,
        NewGoal {
            name: name.to_string(),
            target_amount,
            target_date: None,
            wallet_id: Some(wallet_id),
            initial_amount: Decimal::ZERO,
        },
    )
    .await
}

/// Creates an unlinked goal starting at zero.
pub async fn create_test_goal(
    db: &DatabaseConnection,
    name: &str,
    target_amount: Decimal,
) -> Result<entities::goal::Model> {
    goal::create_goal(
        db,
        TEST_OWNER,
        NewGoal {
            name: name.to_string(),
            target_amount,
            target_date: None,
            wallet_id: None,
            initial_amount: Decimal::ZERO,
        },
    )
    .await
}

/// Re-reads a goal straight from the table.
pub async fn reload_goal(db: &DatabaseConnection, goal_id: i64) -> Result<entities::goal::Model> {
    Goal::find_by_id(goal_id)
        .one(db)
        .await?
        .ok_or(Error::GoalNotFound { id: goal_id })
}

/// Re-reads a wallet straight from the table.
pub async fn reload_wallet(
    db: &DatabaseConnection,
    wallet_id: i64,
) -> Result<entities::wallet::Model> {
    Wallet::find_by_id(wallet_id)
        .one(db)
        .await?
        .ok_or(Error::WalletNotFound { id: wallet_id })
}

/// Books a manual income entry dated 2024-01-15.
pub async fn create_test_income(
    db: &DatabaseConnection,
    wallet_id: i64,
    amount: Decimal,
) -> Result<entities::transaction::Model> {
    create_test_entry(db, wallet_id, amount, TransactionType::Income).await
}

/// Books a manual expense entry dated 2024-01-15.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    wallet_id: i64,
    amount: Decimal,
) -> Result<entities::transaction::Model> {
    create_test_entry(db, wallet_id, amount, TransactionType::Expense).await
}

async fn create_test_entry(
    db: &DatabaseConnection,
    wallet_id: i64,
    amount: Decimal,
    transaction_type: TransactionType,
) -> Result<entities::transaction::Model> {
    transaction::create_transaction(
        db,
        TEST_OWNER,
        NewTransaction {
            wallet_id,
            category_id: None,
            amount,
            transaction_type,
            date: test_date(2024, 1, 15),
            description: format!("Test {transaction_type:?}"),
        },
    )
    .await
}

/// Builds a date, panicking on invalid input. Tests only.
#[allow(clippy::unwrap_used)]
pub fn test_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
