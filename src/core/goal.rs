//! Goal business logic - Creation, wallet linking and manual progress changes.
//!
//! Linked goals get their progress from the synchronizer; the manual
//! add/withdraw operations here are only valid for unlinked goals.

use crate::{
    core::{sync::sync_goals_for_wallet, transaction::validate_amount, wallet},
    entities::{Goal, GoalStatus, goal},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Input for [`create_goal`].
#[derive(Debug, Clone)]
pub struct NewGoal {
    /// Display name
    pub name: String,
    /// Amount at which the goal is complete
    pub target_amount: Decimal,
    /// Optional deadline
    pub target_date: Option<NaiveDate>,
    /// Wallet to mirror, if any
    pub wallet_id: Option<i64>,
    /// Starting progress for unlinked goals; ignored for linked ones
    pub initial_amount: Decimal,
}

/// Creates a goal. A linked goal immediately takes its wallet's balance.
#[instrument(skip(db))]
pub async fn create_goal(
    db: &DatabaseConnection,
    owner_id: &str,
    new_goal: NewGoal,
) -> Result<goal::Model> {
    if new_goal.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Goal name cannot be empty".to_string(),
        });
    }

    if new_goal.target_amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: new_goal.target_amount,
        });
    }

    if new_goal.initial_amount.is_sign_negative() {
        return Err(Error::InvalidAmount {
            amount: new_goal.initial_amount,
        });
    }

    let current_amount = match new_goal.wallet_id {
        Some(wallet_id) => wallet::require_wallet(db, owner_id, wallet_id).await?.balance,
        None => new_goal.initial_amount,
    };

    let model = goal::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(new_goal.name.trim().to_string()),
        target_amount: Set(new_goal.target_amount),
        current_amount: Set(current_amount),
        target_date: Set(new_goal.target_date),
        status: Set(GoalStatus::from_progress(
            current_amount,
            new_goal.target_amount,
        )),
        wallet_id: Set(new_goal.wallet_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// Finds a goal by id, scoped to its owner.
pub async fn get_goal_by_id(
    db: &DatabaseConnection,
    owner_id: &str,
    goal_id: i64,
) -> Result<Option<goal::Model>> {
    Goal::find_by_id(goal_id)
        .filter(goal::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_goal(db: &DatabaseConnection, owner_id: &str, goal_id: i64) -> Result<goal::Model> {
    get_goal_by_id(db, owner_id, goal_id)
        .await?
        .ok_or(Error::GoalNotFound { id: goal_id })
}

/// Lists an owner's goals in creation order.
pub async fn list_goals(db: &DatabaseConnection, owner_id: &str) -> Result<Vec<goal::Model>> {
    Goal::find()
        .filter(goal::Column::OwnerId.eq(owner_id))
        .order_by_asc(goal::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Links a goal to a wallet, or unlinks it with `None`.
///
/// Linking aligns the goal with the wallet straight away. Unlinking keeps the
/// last synchronized amount as the starting point of a manual counter.
#[instrument(skip(db))]
pub async fn link_goal_to_wallet(
    db: &DatabaseConnection,
    owner_id: &str,
    goal_id: i64,
    wallet_id: Option<i64>,
) -> Result<goal::Model> {
    let existing = require_goal(db, owner_id, goal_id).await?;
    if existing.status == GoalStatus::Cancelled {
        return Err(Error::GoalCancelled { goal_id });
    }

    if let Some(wallet_id) = wallet_id {
        wallet::require_wallet(db, owner_id, wallet_id).await?;
    }

    let mut active: goal::ActiveModel = existing.into();
    active.wallet_id = Set(wallet_id);
    active.update(db).await?;

    if let Some(wallet_id) = wallet_id {
        sync_goals_for_wallet(db, owner_id, wallet_id).await?;
    }

    require_goal(db, owner_id, goal_id).await
}

/// Adds money to an unlinked goal.
pub async fn add_to_goal(
    db: &DatabaseConnection,
    owner_id: &str,
    goal_id: i64,
    amount: Decimal,
) -> Result<goal::Model> {
    validate_amount(amount)?;
    adjust_manual_goal(db, owner_id, goal_id, amount).await
}

/// Withdraws money from an unlinked goal; the goal may not go below zero.
pub async fn withdraw_from_goal(
    db: &DatabaseConnection,
    owner_id: &str,
    goal_id: i64,
    amount: Decimal,
) -> Result<goal::Model> {
    validate_amount(amount)?;
    adjust_manual_goal(db, owner_id, goal_id, -amount).await
}

#[instrument(skip(db))]
async fn adjust_manual_goal(
    db: &DatabaseConnection,
    owner_id: &str,
    goal_id: i64,
    delta: Decimal,
) -> Result<goal::Model> {
    let existing = require_goal(db, owner_id, goal_id).await?;

    if let Some(wallet_id) = existing.wallet_id {
        return Err(Error::GoalLinkedToWallet { goal_id, wallet_id });
    }
    if existing.status == GoalStatus::Cancelled {
        return Err(Error::GoalCancelled { goal_id });
    }

    let current_amount = existing
        .current_amount
        .checked_add(delta)
        .ok_or(Error::InvalidAmount { amount: delta.abs() })?;
    if current_amount.is_sign_negative() {
        return Err(Error::InsufficientGoalFunds {
            current: existing.current_amount,
            requested: -delta,
        });
    }

    let status = GoalStatus::from_progress(current_amount, existing.target_amount);
    let mut active: goal::ActiveModel = existing.into();
    active.current_amount = Set(current_amount);
    active.status = Set(status);

    Ok(active.update(db).await?)
}

/// Cancels a goal. Synchronization never touches cancelled goals.
pub async fn cancel_goal(
    db: &DatabaseConnection,
    owner_id: &str,
    goal_id: i64,
) -> Result<goal::Model> {
    let existing = require_goal(db, owner_id, goal_id).await?;

    let mut active: goal::ActiveModel = existing.into();
    active.status = Set(GoalStatus::Cancelled);
    let cancelled = active.update(db).await?;

    info!(goal_id, "Goal cancelled");
    Ok(cancelled)
}

/// Brings a cancelled goal back; linked goals are re-synced with their wallet.
pub async fn reactivate_goal(
    db: &DatabaseConnection,
    owner_id: &str,
    goal_id: i64,
) -> Result<goal::Model> {
    let existing = require_goal(db, owner_id, goal_id).await?;
    if existing.status != GoalStatus::Cancelled {
        return Ok(existing);
    }

    let wallet_id = existing.wallet_id;
    let status = GoalStatus::from_progress(existing.current_amount, existing.target_amount);
    let mut active: goal::ActiveModel = existing.into();
    active.status = Set(status);
    active.update(db).await?;

    if let Some(wallet_id) = wallet_id {
        sync_goals_for_wallet(db, owner_id, wallet_id).await?;
    }

    require_goal(db, owner_id, goal_id).await
}
