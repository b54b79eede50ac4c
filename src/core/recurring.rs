//! Recurring materializer
//!
//! Turns due recurring definitions into ledger transactions. Each call to
//! [`process_due`] books at most one occurrence per definition, dated at the
//! definition's `next_date`, and advances the schedule by one period.
//!
//! Every occurrence is booked in its own store transaction together with the
//! schedule advance, and two guards keep an occurrence from being booked twice
//! when runs overlap or are retried:
//!
//! 1. `next_date` is advanced with a compare-and-set on the value the run read,
//!    so only one run can claim a given occurrence.
//! 2. `transactions(recurring_id, date)` is unique, so even a schedule that was
//!    moved back by hand cannot produce a second row for the same date.

use crate::{
    core::{
        schedule::next_occurrence,
        sync::sync_goals_for_wallet,
        transaction::{NewTransaction, book_transaction, validate_amount},
        wallet,
    },
    entities::{Frequency, RecurringTransaction, TransactionType, recurring_transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait, prelude::*, sea_query::Expr,
};
use tracing::{debug, error, info, instrument, warn};

/// Input for [`create_recurring`].
#[derive(Debug, Clone)]
pub struct NewRecurring {
    /// Wallet every occurrence books into
    pub wallet_id: i64,
    /// Optional category copied onto occurrences
    pub category_id: Option<i64>,
    /// Positive amount per occurrence
    pub amount: Decimal,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Description copied onto occurrences
    pub description: String,
    /// Schedule period
    pub frequency: Frequency,
    /// First due date
    pub next_date: NaiveDate,
}

/// Knobs for [`process_due`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Sync goals linked to the wallet after each booked occurrence.
    ///
    /// `false` reproduces the older behaviour where only manual entries and
    /// distributions refreshed goal progress.
    pub sync_goals: bool,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self { sync_goals: true }
    }
}

/// One occurrence that was booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedOccurrence {
    /// Definition the occurrence came from
    pub recurring_id: i64,
    /// Ledger transaction that was created
    pub transaction_id: i64,
    /// Wallet it was booked against
    pub wallet_id: i64,
    /// Date of the occurrence (the definition's old `next_date`)
    pub occurrence_date: NaiveDate,
    /// The definition's new `next_date`
    pub next_date: NaiveDate,
}

/// One definition that could not be processed; it stays due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeFailure {
    /// Definition that failed
    pub recurring_id: i64,
    /// Occurrence that was attempted
    pub occurrence_date: NaiveDate,
    /// Error message from the store or validation
    pub error: String,
}

/// Summary of a [`process_due`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDueResult {
    /// Cut-off date the run used
    pub as_of: NaiveDate,
    /// Number of transactions created
    pub processed_count: usize,
    /// Occurrences already claimed or booked by another run
    pub duplicates_skipped: usize,
    /// Every occurrence that was booked
    pub materialized: Vec<MaterializedOccurrence>,
    /// Definitions that failed and remain due
    pub failures: Vec<MaterializeFailure>,
}

/// What happened to a single occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Materialized(MaterializedOccurrence),
    AlreadyMaterialized,
}

/// Creates an active recurring definition.
#[instrument(skip(db))]
pub async fn create_recurring(
    db: &DatabaseConnection,
    owner_id: &str,
    new_recurring: NewRecurring,
) -> Result<recurring_transaction::Model> {
    validate_amount(new_recurring.amount)?;
    wallet::require_wallet(db, owner_id, new_recurring.wallet_id).await?;

    let model = recurring_transaction::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        wallet_id: Set(new_recurring.wallet_id),
        category_id: Set(new_recurring.category_id),
        amount: Set(new_recurring.amount),
        transaction_type: Set(new_recurring.transaction_type),
        description: Set(new_recurring.description),
        frequency: Set(new_recurring.frequency),
        next_date: Set(new_recurring.next_date),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// Finds a recurring definition by id, scoped to its owner.
pub async fn get_recurring_by_id(
    db: &DatabaseConnection,
    owner_id: &str,
    recurring_id: i64,
) -> Result<Option<recurring_transaction::Model>> {
    RecurringTransaction::find_by_id(recurring_id)
        .filter(recurring_transaction::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists an owner's recurring definitions by next due date.
pub async fn list_recurring(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<recurring_transaction::Model>> {
    RecurringTransaction::find()
        .filter(recurring_transaction::Column::OwnerId.eq(owner_id))
        .order_by_asc(recurring_transaction::Column::NextDate)
        .order_by_asc(recurring_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pauses (`false`) or resumes (`true`) a recurring definition.
#[instrument(skip(db))]
pub async fn set_recurring_active(
    db: &DatabaseConnection,
    owner_id: &str,
    recurring_id: i64,
    is_active: bool,
) -> Result<recurring_transaction::Model> {
    let existing = get_recurring_by_id(db, owner_id, recurring_id)
        .await?
        .ok_or(Error::RecurringNotFound { id: recurring_id })?;

    let mut active: recurring_transaction::ActiveModel = existing.into();
    active.is_active = Set(is_active);
    Ok(active.update(db).await?)
}

/// Owners that have at least one active definition due on or before `as_of`.
pub async fn owners_with_due_items(db: &DatabaseConnection, as_of: NaiveDate) -> Result<Vec<String>> {
    RecurringTransaction::find()
        .select_only()
        .column(recurring_transaction::Column::OwnerId)
        .distinct()
        .filter(recurring_transaction::Column::IsActive.eq(true))
        .filter(recurring_transaction::Column::NextDate.lte(as_of))
        .order_by_asc(recurring_transaction::Column::OwnerId)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Materializes every active definition of `owner_id` due on or before `as_of`.
///
/// A failing definition is recorded in [`ProcessDueResult::failures`], keeps
/// its `next_date` and is retried by the next run; the rest of the batch
/// continues.
#[instrument(skip(db, options))]
pub async fn process_due(
    db: &DatabaseConnection,
    owner_id: &str,
    as_of: NaiveDate,
    options: &MaterializeOptions,
) -> Result<ProcessDueResult> {
    let due = RecurringTransaction::find()
        .filter(recurring_transaction::Column::OwnerId.eq(owner_id))
        .filter(recurring_transaction::Column::IsActive.eq(true))
        .filter(recurring_transaction::Column::NextDate.lte(as_of))
        .order_by_asc(recurring_transaction::Column::NextDate)
        .order_by_asc(recurring_transaction::Column::Id)
        .all(db)
        .await?;

    debug!(due = due.len(), "Due recurring definitions loaded");

    let mut result = ProcessDueResult {
        as_of,
        processed_count: 0,
        duplicates_skipped: 0,
        materialized: Vec::new(),
        failures: Vec::new(),
    };

    for definition in due {
        match materialize_occurrence(db, owner_id, &definition).await {
            Ok(Outcome::Materialized(occurrence)) => {
                if options.sync_goals {
                    if let Err(e) = sync_goals_for_wallet(db, owner_id, occurrence.wallet_id).await
                    {
                        error!(
                            wallet_id = occurrence.wallet_id,
                            "Goal sync after materialization failed: {e}"
                        );
                    }
                }
                result.processed_count += 1;
                result.materialized.push(occurrence);
            }
            Ok(Outcome::AlreadyMaterialized) => {
                result.duplicates_skipped += 1;
            }
            Err(e) => {
                warn!(
                    recurring_id = definition.id,
                    "Failed to materialize occurrence: {e}"
                );
                result.failures.push(MaterializeFailure {
                    recurring_id: definition.id,
                    occurrence_date: definition.next_date,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        processed = result.processed_count,
        duplicates = result.duplicates_skipped,
        failed = result.failures.len(),
        "Recurring processing finished"
    );
    Ok(result)
}

/// Books the occurrence at `definition.next_date` and advances the schedule.
///
/// `definition` is the snapshot the caller read; if the stored schedule has
/// moved on since (another run claimed it, or it was paused) nothing is written.
pub(crate) async fn materialize_occurrence(
    db: &DatabaseConnection,
    owner_id: &str,
    definition: &recurring_transaction::Model,
) -> Result<Outcome> {
    let occurrence_date = definition.next_date;
    let next_date = next_occurrence(occurrence_date, definition.frequency);

    let txn = db.begin().await?;

    let claimed = RecurringTransaction::update_many()
        .col_expr(recurring_transaction::Column::NextDate, Expr::value(next_date))
        .filter(recurring_transaction::Column::Id.eq(definition.id))
        .filter(recurring_transaction::Column::OwnerId.eq(owner_id))
        .filter(recurring_transaction::Column::NextDate.eq(occurrence_date))
        .filter(recurring_transaction::Column::IsActive.eq(true))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        txn.rollback().await?;
        debug!(
            recurring_id = definition.id,
            %occurrence_date,
            "Occurrence already claimed by another run"
        );
        return Ok(Outcome::AlreadyMaterialized);
    }

    let entry = NewTransaction {
        wallet_id: definition.wallet_id,
        category_id: definition.category_id,
        amount: definition.amount,
        transaction_type: definition.transaction_type,
        date: occurrence_date,
        description: definition.description.clone(),
    };

    let booked = match book_transaction(&txn, owner_id, &entry, Some(definition.id)).await {
        Ok(booked) => booked,
        Err(Error::Database(e))
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
        {
            // The ledger already holds this occurrence; keep the advance.
            txn.commit().await?;
            warn!(
                recurring_id = definition.id,
                %occurrence_date,
                "Occurrence already in ledger, schedule advanced without booking"
            );
            return Ok(Outcome::AlreadyMaterialized);
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                error!(recurring_id = definition.id, "Rollback failed: {rollback}");
            }
            return Err(e);
        }
    };

    txn.commit().await?;

    debug!(
        recurring_id = definition.id,
        transaction_id = booked.id,
        %next_date,
        "Occurrence materialized"
    );

    Ok(Outcome::Materialized(MaterializedOccurrence {
        recurring_id: definition.id,
        transaction_id: booked.id,
        wallet_id: definition.wallet_id,
        occurrence_date,
        next_date,
    }))
}

/// Formats a processing result into a human-readable summary for logs.
#[must_use]
pub fn format_process_summary(owner_id: &str, result: &ProcessDueResult) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "Recurring run for {owner_id} as of {} - {} booked, {} duplicate, {} failed\n",
        result.as_of,
        result.processed_count,
        result.duplicates_skipped,
        result.failures.len()
    );

    for occurrence in &result.materialized {
        // Writing to a String cannot fail
        let _ = writeln!(
            summary,
            "  #{} -> transaction {} on {} (next {})",
            occurrence.recurring_id,
            occurrence.transaction_id,
            occurrence.occurrence_date,
            occurrence.next_date
        );
    }

    for failure in &result.failures {
        let _ = writeln!(
            summary,
            "  #{} FAILED for {}: {}",
            failure.recurring_id, failure.occurrence_date, failure.error
        );
    }

    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::transaction::get_transactions_for_wallet;
    use crate::entities::{GoalStatus, Transaction, transaction};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn monthly_bill(wallet_id: i64, next_date: NaiveDate) -> NewRecurring {
        NewRecurring {
            wallet_id,
            category_id: Some(3),
            amount: dec!(50000),
            transaction_type: TransactionType::Expense,
            description: "Internet bill".to_string(),
            frequency: Frequency::Monthly,
            next_date,
        }
    }

    async fn reload(db: &DatabaseConnection, id: i64) -> Result<recurring_transaction::Model> {
        Ok(get_recurring_by_id(db, TEST_OWNER, id).await?.unwrap())
    }

    #[tokio::test]
    async fn test_create_recurring_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_recurring(
            &db,
            TEST_OWNER,
            NewRecurring {
                amount: Decimal::ZERO,
                ..monthly_bill(1, test_date(2024, 1, 1))
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_recurring_unknown_wallet() -> Result<()> {
        let db = setup_test_db().await?;
        let result =
            create_recurring(&db, TEST_OWNER, monthly_bill(12, test_date(2024, 1, 1))).await;
        assert!(matches!(result, Err(Error::WalletNotFound { id: 12 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_process_due_leap_year_bill() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let bill = create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 1, 31)))
            .await?;

        let result = process_due(
            &db,
            TEST_OWNER,
            test_date(2024, 2, 5),
            &MaterializeOptions::default(),
        )
        .await?;
        assert_eq!(result.processed_count, 1);
        assert_eq!(result.duplicates_skipped, 0);
        assert!(result.failures.is_empty());

        let transactions = get_transactions_for_wallet(&db, TEST_OWNER, wallet.id, None).await?;
        assert_eq!(transactions.len(), 1);
        let booked = &transactions[0];
        assert_eq!(booked.date, test_date(2024, 1, 31));
        assert_eq!(booked.amount, dec!(50000));
        assert_eq!(booked.transaction_type, TransactionType::Expense);
        assert_eq!(booked.category_id, Some(3));
        assert_eq!(booked.description, "Internet bill");
        assert_eq!(booked.recurring_id, Some(bill.id));

        let bill = reload(&db, bill.id).await?;
        assert_eq!(bill.next_date, test_date(2024, 2, 29));

        let wallet = reload_wallet(&db, wallet.id).await?;
        assert_eq!(wallet.balance, dec!(-50000));

        Ok(())
    }

    #[tokio::test]
    async fn test_process_due_one_occurrence_per_call() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let daily = create_recurring(
            &db,
            TEST_OWNER,
            NewRecurring {
                frequency: Frequency::Daily,
                amount: dec!(5),
                ..monthly_bill(wallet.id, test_date(2024, 5, 1))
            },
        )
        .await?;

        let as_of = test_date(2024, 5, 3);
        for expected_next in [
            test_date(2024, 5, 2),
            test_date(2024, 5, 3),
            test_date(2024, 5, 4),
        ] {
            let result =
                process_due(&db, TEST_OWNER, as_of, &MaterializeOptions::default()).await?;
            assert_eq!(result.processed_count, 1);
            assert_eq!(reload(&db, daily.id).await?.next_date, expected_next);
        }

        // Caught up: nothing left to do
        let result = process_due(&db, TEST_OWNER, as_of, &MaterializeOptions::default()).await?;
        assert_eq!(result.processed_count, 0);

        let dates: Vec<_> = get_transactions_for_wallet(&db, TEST_OWNER, wallet.id, None)
            .await?
            .into_iter()
            .map(|t| t.date)
            .collect();
        assert_eq!(
            dates,
            vec![test_date(2024, 5, 3), test_date(2024, 5, 2), test_date(2024, 5, 1)]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_process_due_skips_inactive_and_future() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let paused =
            create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 1, 1)))
                .await?;
        set_recurring_active(&db, TEST_OWNER, paused.id, false).await?;
        let future =
            create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 3, 1)))
                .await?;

        let result = process_due(
            &db,
            TEST_OWNER,
            test_date(2024, 2, 1),
            &MaterializeOptions::default(),
        )
        .await?;
        assert_eq!(result.processed_count, 0);
        assert_eq!(reload(&db, paused.id).await?.next_date, test_date(2024, 1, 1));
        assert_eq!(reload(&db, future.id).await?.next_date, test_date(2024, 3, 1));

        // Resuming makes the paused definition due again
        set_recurring_active(&db, TEST_OWNER, paused.id, true).await?;
        let result = process_due(
            &db,
            TEST_OWNER,
            test_date(2024, 2, 1),
            &MaterializeOptions::default(),
        )
        .await?;
        assert_eq!(result.processed_count, 1);
        assert_eq!(result.materialized[0].recurring_id, paused.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_process_due_only_touches_owner() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let bill =
            create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 1, 1)))
                .await?;

        let result = process_due(
            &db,
            "someone-else",
            test_date(2024, 6, 1),
            &MaterializeOptions::default(),
        )
        .await?;
        assert_eq!(result.processed_count, 0);
        assert_eq!(reload(&db, bill.id).await?.next_date, test_date(2024, 1, 1));

        Ok(())
    }

    #[tokio::test]
    async fn test_stale_snapshot_does_not_double_book() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let bill =
            create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 1, 31)))
                .await?;

        // Two overlapping runs both read the definition before either commits
        let snapshot = reload(&db, bill.id).await?;
        let first = materialize_occurrence(&db, TEST_OWNER, &snapshot).await?;
        let second = materialize_occurrence(&db, TEST_OWNER, &snapshot).await?;

        assert!(matches!(first, Outcome::Materialized(_)));
        assert_eq!(second, Outcome::AlreadyMaterialized);

        let count = Transaction::find()
            .filter(transaction::Column::RecurringId.eq(bill.id))
            .count(&db)
            .await?;
        assert_eq!(count, 1);
        assert_eq!(reload(&db, bill.id).await?.next_date, test_date(2024, 2, 29));
        assert_eq!(reload_wallet(&db, wallet.id).await?.balance, dec!(-50000));

        Ok(())
    }

    #[tokio::test]
    async fn test_rewound_schedule_is_caught_by_unique_index() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let bill =
            create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 1, 31)))
                .await?;
        let as_of = test_date(2024, 2, 5);

        process_due(&db, TEST_OWNER, as_of, &MaterializeOptions::default()).await?;

        // Move the schedule back onto the occurrence that was already booked
        let mut rewound: recurring_transaction::ActiveModel = reload(&db, bill.id).await?.into();
        rewound.next_date = Set(test_date(2024, 1, 31));
        rewound.update(&db).await?;

        let result = process_due(&db, TEST_OWNER, as_of, &MaterializeOptions::default()).await?;
        assert_eq!(result.processed_count, 0);
        assert_eq!(result.duplicates_skipped, 1);
        assert!(result.failures.is_empty());

        let transactions = get_transactions_for_wallet(&db, TEST_OWNER, wallet.id, None).await?;
        assert_eq!(transactions.len(), 1);
        assert_eq!(reload(&db, bill.id).await?.next_date, test_date(2024, 2, 29));
        assert_eq!(reload_wallet(&db, wallet.id).await?.balance, dec!(-50000));

        Ok(())
    }

    #[tokio::test]
    async fn test_failure_leaves_item_due_and_batch_continues() -> Result<()> {
        let db = setup_test_db().await?;
        let doomed_wallet = create_test_wallet(&db, "Closing").await?;
        let healthy_wallet = create_test_wallet(&db, "Healthy").await?;

        let doomed =
            create_recurring(&db, TEST_OWNER, monthly_bill(doomed_wallet.id, test_date(2024, 1, 1)))
                .await?;
        let healthy = create_recurring(
            &db,
            TEST_OWNER,
            monthly_bill(healthy_wallet.id, test_date(2024, 1, 2)),
        )
        .await?;

        // The wallet changes hands; the definition can no longer book into it
        let mut moved: crate::entities::wallet::ActiveModel = doomed_wallet.into();
        moved.owner_id = Set("previous-owner".to_string());
        moved.update(&db).await?;

        let result = process_due(
            &db,
            TEST_OWNER,
            test_date(2024, 1, 15),
            &MaterializeOptions::default(),
        )
        .await?;

        assert_eq!(result.processed_count, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].recurring_id, doomed.id);
        assert_eq!(result.failures[0].occurrence_date, test_date(2024, 1, 1));
        assert!(result.failures[0].error.contains("Wallet not found"));

        assert_eq!(reload(&db, doomed.id).await?.next_date, test_date(2024, 1, 1));
        assert_eq!(reload(&db, healthy.id).await?.next_date, test_date(2024, 2, 2));

        Ok(())
    }

    #[tokio::test]
    async fn test_goal_sync_after_materialization() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let goal = create_linked_goal(&db, "Salary target", dec!(3000), wallet.id).await?;
        create_recurring(
            &db,
            TEST_OWNER,
            NewRecurring {
                amount: dec!(3000),
                transaction_type: TransactionType::Income,
                description: "Salary".to_string(),
                ..monthly_bill(wallet.id, test_date(2024, 1, 25))
            },
        )
        .await?;

        process_due(
            &db,
            TEST_OWNER,
            test_date(2024, 1, 25),
            &MaterializeOptions::default(),
        )
        .await?;

        let goal = reload_goal(&db, goal.id).await?;
        assert_eq!(goal.current_amount, dec!(3000));
        assert_eq!(goal.status, GoalStatus::Completed);

        Ok(())
    }

    #[tokio::test]
    async fn test_goal_sync_can_be_disabled() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let goal = create_linked_goal(&db, "Salary target", dec!(3000), wallet.id).await?;
        create_recurring(
            &db,
            TEST_OWNER,
            NewRecurring {
                amount: dec!(3000),
                transaction_type: TransactionType::Income,
                ..monthly_bill(wallet.id, test_date(2024, 1, 25))
            },
        )
        .await?;

        process_due(
            &db,
            TEST_OWNER,
            test_date(2024, 1, 25),
            &MaterializeOptions { sync_goals: false },
        )
        .await?;

        // Wallet moved, goal did not
        assert_eq!(reload_wallet(&db, wallet.id).await?.balance, dec!(3000));
        let goal = reload_goal(&db, goal.id).await?;
        assert_eq!(goal.current_amount, Decimal::ZERO);
        assert_eq!(goal.status, GoalStatus::Active);

        Ok(())
    }

    #[tokio::test]
    async fn test_owners_with_due_items() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 1, 1))).await?;
        create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 1, 2))).await?;

        assert_eq!(
            owners_with_due_items(&db, test_date(2024, 1, 1)).await?,
            vec![TEST_OWNER.to_string()]
        );
        assert!(owners_with_due_items(&db, test_date(2023, 12, 31)).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_recurring_and_not_found() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let later =
            create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 9, 1)))
                .await?;
        let sooner =
            create_recurring(&db, TEST_OWNER, monthly_bill(wallet.id, test_date(2024, 2, 1)))
                .await?;

        assert_eq!(list_recurring(&db, TEST_OWNER).await?, vec![sooner, later]);
        assert!(matches!(
            set_recurring_active(&db, TEST_OWNER, 777, false).await,
            Err(Error::RecurringNotFound { id: 777 })
        ));

        Ok(())
    }

    #[test]
    fn test_format_process_summary() {
        let result = ProcessDueResult {
            as_of: test_date(2024, 2, 5),
            processed_count: 1,
            duplicates_skipped: 1,
            materialized: vec![MaterializedOccurrence {
                recurring_id: 4,
                transaction_id: 10,
                wallet_id: 1,
                occurrence_date: test_date(2024, 1, 31),
                next_date: test_date(2024, 2, 29),
            }],
            failures: vec![MaterializeFailure {
                recurring_id: 5,
                occurrence_date: test_date(2024, 2, 1),
                error: "Wallet not found: 9".to_string(),
            }],
        };

        let summary = format_process_summary("alice", &result);
        assert!(summary.contains("alice as of 2024-02-05"));
        assert!(summary.contains("1 booked, 1 duplicate, 1 failed"));
        assert!(summary.contains("#4 -> transaction 10 on 2024-01-31 (next 2024-02-29)"));
        assert!(summary.contains("#5 FAILED for 2024-02-01: Wallet not found: 9"));
    }
}
