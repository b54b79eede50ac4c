//! Wallet business logic - Creation, lookup and balance maintenance.
//!
//! The wallet balance is the single authoritative mutable value the ledger
//! contends over. It is only ever changed through [`adjust_balance_atomic`],
//! which issues one `UPDATE ... SET balance = balance + delta` so concurrent
//! writers are serialized by the store rather than by read-modify-write code.

use crate::{
    entities::{Transaction, TransactionType, Wallet, WalletType, transaction, wallet},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use tracing::{debug, instrument};

/// Input for [`create_wallet`].
#[derive(Debug, Clone)]
pub struct NewWallet {
    /// Display name
    pub name: String,
    /// Kind of wallet
    pub wallet_type: WalletType,
    /// Opening balance
    pub initial_balance: Decimal,
    /// ISO currency code
    pub currency: String,
    /// Optional icon identifier
    pub icon: Option<String>,
}

/// Creates a wallet whose balance starts at its initial balance.
pub async fn create_wallet(
    db: &DatabaseConnection,
    owner_id: &str,
    new_wallet: NewWallet,
) -> Result<wallet::Model> {
    if new_wallet.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Wallet name cannot be empty".to_string(),
        });
    }

    if new_wallet.currency.trim().is_empty() {
        return Err(Error::Validation {
            message: "Wallet currency cannot be empty".to_string(),
        });
    }

    let wallet = wallet::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(new_wallet.name.trim().to_string()),
        wallet_type: Set(new_wallet.wallet_type),
        initial_balance: Set(new_wallet.initial_balance),
        balance: Set(new_wallet.initial_balance),
        currency: Set(new_wallet.currency.trim().to_uppercase()),
        icon: Set(new_wallet.icon),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(wallet.insert(db).await?)
}

/// Finds a wallet by id, scoped to its owner.
pub async fn get_wallet<C>(db: &C, owner_id: &str, wallet_id: i64) -> Result<Option<wallet::Model>>
where
    C: ConnectionTrait,
{
    Wallet::find_by_id(wallet_id)
        .filter(wallet::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_wallet`] but a missing wallet is an error.
pub async fn require_wallet<C>(db: &C, owner_id: &str, wallet_id: i64) -> Result<wallet::Model>
where
    C: ConnectionTrait,
{
    get_wallet(db, owner_id, wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: wallet_id })
}

/// Lists all wallets of an owner, ordered alphabetically by name.
pub async fn list_wallets(db: &DatabaseConnection, owner_id: &str) -> Result<Vec<wallet::Model>> {
    Wallet::find()
        .filter(wallet::Column::OwnerId.eq(owner_id))
        .order_by_asc(wallet::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds `delta` to a wallet balance in a single statement and returns the updated wallet.
///
/// # Arguments
/// * `db` - Database connection or transaction
/// * `owner_id` - Owner the wallet must belong to
/// * `wallet_id` - Wallet to update
/// * `delta` - Signed amount to add (negative for expenses)
#[instrument(skip(db))]
pub async fn adjust_balance_atomic<C>(
    db: &C,
    owner_id: &str,
    wallet_id: i64,
    delta: Decimal,
) -> Result<wallet::Model>
where
    C: ConnectionTrait,
{
    let result = Wallet::update_many()
        .col_expr(
            wallet::Column::Balance,
            Expr::col(wallet::Column::Balance).add(delta),
        )
        .filter(wallet::Column::Id.eq(wallet_id))
        .filter(wallet::Column::OwnerId.eq(owner_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::WalletNotFound { id: wallet_id });
    }

    let updated = require_wallet(db, owner_id, wallet_id).await?;
    debug!(balance = %updated.balance, "Wallet balance adjusted");
    Ok(updated)
}

/// Recomputes what a wallet's balance should be from its history.
///
/// Returns `initial_balance + Σ income − Σ expense`. The engine never uses
/// this to set the balance; it exists to reconcile the denormalized value.
pub async fn expected_balance<C>(db: &C, owner_id: &str, wallet_id: i64) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let wallet = require_wallet(db, owner_id, wallet_id).await?;
    let income = sum_amounts(db, owner_id, wallet_id, TransactionType::Income).await?;
    let expense = sum_amounts(db, owner_id, wallet_id, TransactionType::Expense).await?;
    Ok(wallet.initial_balance + income - expense)
}

async fn sum_amounts<C>(
    db: &C,
    owner_id: &str,
    wallet_id: i64,
    transaction_type: TransactionType,
) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let total: Option<Option<Decimal>> = Transaction::find()
        .select_only()
        .column_as(transaction::Column::Amount.sum(), "total")
        .filter(transaction::Column::OwnerId.eq(owner_id))
        .filter(transaction::Column::WalletId.eq(wallet_id))
        .filter(transaction::Column::TransactionType.eq(transaction_type))
        .into_tuple()
        .one(db)
        .await?;

    Ok(total.flatten().unwrap_or(Decimal::ZERO))
}
