//! Income distribution allocator
//!
//! Splits one income event across several wallets. The whole request is
//! validated before anything is written; after that each allocation becomes
//! one income transaction and the goals of every wallet that received money
//! are synchronized exactly once.

use crate::{
    core::{
        sync::sync_goals_for_wallet,
        template::save_template_from_allocations,
        transaction::{NewTransaction, book_transaction},
    },
    entities::TransactionType,
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, instrument, warn};

/// Default allowed gap between the allocation sum and the declared total.
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const DEFAULT_DESCRIPTION: &str = "Income distribution";

/// How a distribution reacts to a failing allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    /// Each allocation commits on its own; failures are reported and the rest
    /// still land.
    #[default]
    BestEffort,
    /// All allocations commit together or not at all.
    Atomic,
}

/// Knobs for [`distribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionOptions {
    /// Allowed gap between the allocation sum and the total
    pub tolerance: Decimal,
    /// Failure handling
    pub mode: DistributionMode,
}

impl Default for DistributionOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            mode: DistributionMode::BestEffort,
        }
    }
}

/// One wallet's share of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationInput {
    /// Receiving wallet
    pub wallet_id: i64,
    /// Amount booked as income; zero rows are skipped
    pub amount: Decimal,
}

/// Input for [`distribute`].
#[derive(Debug, Clone, Default)]
pub struct DistributionRequest {
    /// Declared income total
    pub total_amount: Decimal,
    /// Per-wallet shares, processed in order
    pub allocations: Vec<AllocationInput>,
    /// Category stamped on every created transaction
    pub category_id: Option<i64>,
    /// Description, "Income distribution" when absent
    pub description: Option<String>,
    /// Booking date, today when absent
    pub date: Option<NaiveDate>,
    /// Save the split as a percentage template under this name
    pub save_as_template: Option<String>,
}

/// An allocation that was written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedAllocation {
    /// Receiving wallet
    pub wallet_id: i64,
    /// Amount booked
    pub amount: Decimal,
    /// Created income transaction
    pub transaction_id: i64,
}

/// An allocation that did not make it into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAllocation {
    /// Intended wallet
    pub wallet_id: i64,
    /// Intended amount
    pub amount: Decimal,
    /// Why it failed
    pub error: String,
}

/// Outcome of a distribution that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResult {
    /// Every allocation landed
    FullSuccess {
        /// Allocations written, in request order
        committed: Vec<CommittedAllocation>,
    },
    /// Some allocations landed, the rest failed and were not retried
    PartialSuccess {
        /// Allocations written, in request order
        committed: Vec<CommittedAllocation>,
        /// Allocations that failed
        failed: Vec<FailedAllocation>,
    },
    /// Nothing landed
    TotalFailure {
        /// Allocations that failed or were rolled back
        failed: Vec<FailedAllocation>,
    },
}

impl BatchResult {
    fn from_parts(committed: Vec<CommittedAllocation>, failed: Vec<FailedAllocation>) -> Self {
        match (committed.is_empty(), failed.is_empty()) {
            (_, true) => Self::FullSuccess { committed },
            (true, false) => Self::TotalFailure { failed },
            (false, false) => Self::PartialSuccess { committed, failed },
        }
    }

    /// Allocations that were written.
    #[must_use]
    pub fn committed(&self) -> &[CommittedAllocation] {
        match self {
            Self::FullSuccess { committed } | Self::PartialSuccess { committed, .. } => committed,
            Self::TotalFailure { .. } => &[],
        }
    }

    /// Allocations that failed.
    #[must_use]
    pub fn failed(&self) -> &[FailedAllocation] {
        match self {
            Self::FullSuccess { .. } => &[],
            Self::PartialSuccess { failed, .. } | Self::TotalFailure { failed } => failed,
        }
    }

    /// Number of transactions the distribution created.
    #[must_use]
    pub fn transactions_created(&self) -> usize {
        self.committed().len()
    }

    /// `true` only when every allocation landed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::FullSuccess { .. })
    }
}

/// Sums allocation amounts, rejecting a sum that does not fit in a `Decimal`.
pub(crate) fn allocation_sum(allocations: &[AllocationInput]) -> Result<Decimal> {
    allocations.iter().try_fold(Decimal::ZERO, |sum, a| {
        sum.checked_add(a.amount)
            .ok_or(Error::InvalidAmount { amount: a.amount })
    })
}

/// Checks the request without touching the store.
pub fn validate_request(request: &DistributionRequest, tolerance: Decimal) -> Result<()> {
    if request.total_amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: request.total_amount,
        });
    }

    if let Some(negative) = request
        .allocations
        .iter()
        .find(|a| a.amount < Decimal::ZERO)
    {
        return Err(Error::InvalidAmount {
            amount: negative.amount,
        });
    }

    if !request.allocations.iter().any(|a| a.amount > Decimal::ZERO) {
        return Err(Error::EmptyDistribution);
    }

    let allocated = allocation_sum(&request.allocations)?;
    if (allocated - request.total_amount).abs() > tolerance {
        return Err(Error::AllocationMismatch {
            total: request.total_amount,
            allocated,
        });
    }

    Ok(())
}

/// Distributes an income event across wallets.
///
/// Validation failures return `Err` and write nothing. Once validation passes,
/// per-allocation failures are reported inside the [`BatchResult`] instead.
#[instrument(skip(db, request), fields(total = %request.total_amount, rows = request.allocations.len()))]
pub async fn distribute(
    db: &DatabaseConnection,
    owner_id: &str,
    request: &DistributionRequest,
    options: &DistributionOptions,
) -> Result<BatchResult> {
    validate_request(request, options.tolerance)?;

    if let Some(name) = &request.save_as_template {
        save_template_from_allocations(db, owner_id, name, &request.allocations).await?;
    }

    let entries = income_entries(request);

    let (result, synced) = match options.mode {
        DistributionMode::BestEffort => distribute_best_effort(db, owner_id, &entries).await,
        DistributionMode::Atomic => distribute_atomic(db, owner_id, &entries).await,
    };

    debug!(?synced, "Goals synced after distribution");

    match &result {
        BatchResult::FullSuccess { committed } => {
            info!(created = committed.len(), "Distribution completed");
        }
        BatchResult::PartialSuccess { committed, failed } => {
            warn!(
                created = committed.len(),
                failed = failed.len(),
                "Distribution partially applied"
            );
        }
        BatchResult::TotalFailure { failed } => {
            warn!(failed = failed.len(), "Distribution failed");
        }
    }

    Ok(result)
}

/// One income entry per positive allocation, in request order.
fn income_entries(request: &DistributionRequest) -> Vec<NewTransaction> {
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let description = request
        .description
        .clone()
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    request
        .allocations
        .iter()
        .filter(|a| a.amount > Decimal::ZERO)
        .map(|a| NewTransaction {
            wallet_id: a.wallet_id,
            category_id: request.category_id,
            amount: a.amount,
            transaction_type: TransactionType::Income,
            date,
            description: description.clone(),
        })
        .collect()
}

/// Returns the batch result and the wallets whose goals were synced, in sync order.
async fn distribute_best_effort(
    db: &DatabaseConnection,
    owner_id: &str,
    entries: &[NewTransaction],
) -> (BatchResult, Vec<i64>) {
    // A wallet is synced once its last allocation in the request has been handled.
    let last_index: HashMap<i64, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.wallet_id, i))
        .collect();

    let mut committed = Vec::new();
    let mut failed = Vec::new();
    let mut credited: HashSet<i64> = HashSet::new();
    let mut synced = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match book_one(db, owner_id, entry).await {
            Ok(transaction_id) => {
                credited.insert(entry.wallet_id);
                committed.push(CommittedAllocation {
                    wallet_id: entry.wallet_id,
                    amount: entry.amount,
                    transaction_id,
                });
            }
            Err(e) => {
                warn!(wallet_id = entry.wallet_id, "Allocation failed: {e}");
                failed.push(FailedAllocation {
                    wallet_id: entry.wallet_id,
                    amount: entry.amount,
                    error: e.to_string(),
                });
            }
        }

        if last_index.get(&entry.wallet_id) == Some(&index) && credited.contains(&entry.wallet_id)
        {
            sync_after_distribution(db, owner_id, entry.wallet_id).await;
            synced.push(entry.wallet_id);
        }
    }

    (BatchResult::from_parts(committed, failed), synced)
}

async fn book_one(db: &DatabaseConnection, owner_id: &str, entry: &NewTransaction) -> Result<i64> {
    let txn = db.begin().await?;
    let booked = book_transaction(&txn, owner_id, entry, None).await?;
    txn.commit().await?;
    Ok(booked.id)
}

fn all_failed(entries: &[NewTransaction], error: impl Fn(usize) -> String) -> BatchResult {
    BatchResult::TotalFailure {
        failed: entries
            .iter()
            .enumerate()
            .map(|(index, entry)| FailedAllocation {
                wallet_id: entry.wallet_id,
                amount: entry.amount,
                error: error(index),
            })
            .collect(),
    }
}

async fn distribute_atomic(
    db: &DatabaseConnection,
    owner_id: &str,
    entries: &[NewTransaction],
) -> (BatchResult, Vec<i64>) {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => {
            let message = Error::from(e).to_string();
            return (all_failed(entries, |_| message.clone()), Vec::new());
        }
    };

    let mut committed = Vec::with_capacity(entries.len());
    for (failed_index, entry) in entries.iter().enumerate() {
        match book_transaction(&txn, owner_id, entry, None).await {
            Ok(booked) => committed.push(CommittedAllocation {
                wallet_id: entry.wallet_id,
                amount: entry.amount,
                transaction_id: booked.id,
            }),
            Err(e) => {
                warn!(
                    wallet_id = entry.wallet_id,
                    "Allocation failed, rolling back distribution: {e}"
                );
                if let Err(rollback) = txn.rollback().await {
                    error!("Rollback of failed distribution failed: {rollback}");
                }
                let cause = format!("rolled back: wallet {} failed: {e}", entry.wallet_id);
                let result = all_failed(entries, |index| {
                    if index == failed_index {
                        e.to_string()
                    } else {
                        cause.clone()
                    }
                });
                return (result, Vec::new());
            }
        }
    }

    if let Err(e) = txn.commit().await {
        let message = Error::from(e).to_string();
        return (all_failed(entries, |_| message.clone()), Vec::new());
    }

    let mut synced = Vec::new();
    for allocation in &committed {
        if !synced.contains(&allocation.wallet_id) {
            sync_after_distribution(db, owner_id, allocation.wallet_id).await;
            synced.push(allocation.wallet_id);
        }
    }

    (BatchResult::FullSuccess { committed }, synced)
}

async fn sync_after_distribution(db: &DatabaseConnection, owner_id: &str, wallet_id: i64) {
    if let Err(e) = sync_goals_for_wallet(db, owner_id, wallet_id).await {
        error!(wallet_id, "Goal sync after distribution failed: {e}");
    }
}
