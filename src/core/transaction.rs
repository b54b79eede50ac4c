//! Transaction business logic - Manual ledger entries and the shared booking primitive.
//!
//! Every path that writes a transaction goes through `book_transaction`,
//! which inserts the row and moves the wallet balance in the caller's store
//! transaction. The public operations here wrap it in their own store
//! transaction and then re-synchronize goals for every wallet they touched.

use crate::{
    core::{sync::sync_goals_for_wallet, wallet},
    entities::{Transaction, TransactionType, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Fields of a ledger entry, used for both creation and full updates.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Wallet to book against
    pub wallet_id: i64,
    /// Optional category
    pub category_id: Option<i64>,
    /// Positive amount
    pub amount: Decimal,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Booking date
    pub date: NaiveDate,
    /// Free-form description
    pub description: String,
}

pub(crate) fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Inserts a transaction and applies it to the wallet balance on `db`.
///
/// `db` is expected to be a store transaction owned by the caller; nothing is
/// committed here and no goals are synchronized.
pub(crate) async fn book_transaction<C>(
    db: &C,
    owner_id: &str,
    entry: &NewTransaction,
    recurring_id: Option<i64>,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    validate_amount(entry.amount)?;
    wallet::require_wallet(db, owner_id, entry.wallet_id).await?;

    let model = transaction::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        wallet_id: Set(entry.wallet_id),
        category_id: Set(entry.category_id),
        amount: Set(entry.amount),
        transaction_type: Set(entry.transaction_type),
        date: Set(entry.date),
        description: Set(entry.description.clone()),
        recurring_id: Set(recurring_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let inserted = model.insert(db).await?;

    wallet::adjust_balance_atomic(
        db,
        owner_id,
        entry.wallet_id,
        entry.transaction_type.signed(entry.amount),
    )
    .await?;

    Ok(inserted)
}

/// Creates a manual transaction, updates the wallet balance and syncs its goals.
#[instrument(skip(db))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    owner_id: &str,
    entry: NewTransaction,
) -> Result<transaction::Model> {
    validate_amount(entry.amount)?;

    let txn = db.begin().await?;
    let created = book_transaction(&txn, owner_id, &entry, None).await?;
    txn.commit().await?;

    info!(transaction_id = created.id, "Transaction created");
    sync_goals_for_wallet(db, owner_id, created.wallet_id).await?;
    Ok(created)
}

/// Replaces every editable field of a transaction.
///
/// The old amount is reversed on the old wallet and the new amount applied to
/// the new wallet in one store transaction; goals are then synced for both
/// wallets (once if they are the same).
#[instrument(skip(db))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    owner_id: &str,
    transaction_id: i64,
    entry: NewTransaction,
) -> Result<transaction::Model> {
    validate_amount(entry.amount)?;

    let txn = db.begin().await?;

    let existing = find_owned(&txn, owner_id, transaction_id).await?;
    wallet::require_wallet(&txn, owner_id, entry.wallet_id).await?;

    let old_wallet_id = existing.wallet_id;
    let reversal = -existing.transaction_type.signed(existing.amount);

    let mut active: transaction::ActiveModel = existing.into();
    active.wallet_id = Set(entry.wallet_id);
    active.category_id = Set(entry.category_id);
    active.amount = Set(entry.amount);
    active.transaction_type = Set(entry.transaction_type);
    active.date = Set(entry.date);
    active.description = Set(entry.description);
    let updated = active.update(&txn).await?;

    wallet::adjust_balance_atomic(&txn, owner_id, old_wallet_id, reversal).await?;
    wallet::adjust_balance_atomic(
        &txn,
        owner_id,
        updated.wallet_id,
        updated.transaction_type.signed(updated.amount),
    )
    .await?;

    txn.commit().await?;

    sync_goals_for_wallet(db, owner_id, old_wallet_id).await?;
    if updated.wallet_id != old_wallet_id {
        sync_goals_for_wallet(db, owner_id, updated.wallet_id).await?;
    }
    Ok(updated)
}

/// Deletes a transaction, reverses its effect on the wallet and syncs goals.
#[instrument(skip(db))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    owner_id: &str,
    transaction_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;

    let existing = find_owned(&txn, owner_id, transaction_id).await?;
    let wallet_id = existing.wallet_id;
    let reversal = -existing.transaction_type.signed(existing.amount);

    existing.delete(&txn).await?;
    wallet::adjust_balance_atomic(&txn, owner_id, wallet_id, reversal).await?;

    txn.commit().await?;

    sync_goals_for_wallet(db, owner_id, wallet_id).await?;
    Ok(())
}

async fn find_owned<C>(db: &C, owner_id: &str, transaction_id: i64) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })
}

/// Retrieves a transaction by id, returning None if missing or owned by someone else.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    owner_id: &str,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a wallet's transactions, newest first, optionally limited to an
/// inclusive date range.
pub async fn get_transactions_for_wallet(
    db: &DatabaseConnection,
    owner_id: &str,
    wallet_id: i64,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<Vec<transaction::Model>> {
    let mut query = Transaction::find()
        .filter(transaction::Column::OwnerId.eq(owner_id))
        .filter(transaction::Column::WalletId.eq(wallet_id));

    if let Some((from, to)) = range {
        query = query.filter(transaction::Column::Date.between(from, to));
    }

    query
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
