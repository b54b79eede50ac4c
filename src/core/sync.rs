//! Goal-wallet synchronizer
//!
//! A goal linked to a wallet mirrors that wallet's balance. Every mutation that
//! can move a wallet balance calls [`sync_goals_for_wallet`] afterwards. The
//! synchronizer only ever writes goal rows, never transactions.

use crate::{
    core::wallet,
    entities::{Goal, GoalStatus, goal},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// Outcome of one synchronization pass over a wallet's goals.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalSyncResult {
    /// Wallet that was synchronized
    pub wallet_id: i64,
    /// Balance the goals were aligned to
    pub balance: Decimal,
    /// Number of non-cancelled goals linked to the wallet
    pub goals_checked: usize,
    /// Number of goal rows that actually changed
    pub goals_updated: usize,
    /// Goals that moved from active to completed in this pass
    pub newly_completed: Vec<i64>,
}

/// Aligns every non-cancelled goal linked to `wallet_id` with the wallet's balance.
///
/// Sets `current_amount` to the balance and the status to completed when the
/// balance reaches the target, active otherwise. Goals already in sync are not
/// rewritten, so calling this twice without an intervening wallet mutation
/// changes nothing the second time.
#[instrument(skip(db))]
pub async fn sync_goals_for_wallet<C>(
    db: &C,
    owner_id: &str,
    wallet_id: i64,
) -> Result<GoalSyncResult>
where
    C: ConnectionTrait,
{
    let balance = wallet::require_wallet(db, owner_id, wallet_id).await?.balance;

    let goals = Goal::find()
        .filter(goal::Column::OwnerId.eq(owner_id))
        .filter(goal::Column::WalletId.eq(wallet_id))
        .filter(goal::Column::Status.ne(GoalStatus::Cancelled))
        .order_by_asc(goal::Column::Id)
        .all(db)
        .await?;

    let goals_checked = goals.len();
    let mut goals_updated = 0;
    let mut newly_completed = Vec::new();

    for linked in goals {
        let status = GoalStatus::from_progress(balance, linked.target_amount);
        if linked.current_amount == balance && linked.status == status {
            continue;
        }

        if status == GoalStatus::Completed && linked.status != GoalStatus::Completed {
            newly_completed.push(linked.id);
        }

        let goal_id = linked.id;
        let mut active: goal::ActiveModel = linked.into();
        active.current_amount = Set(balance);
        active.status = Set(status);
        active.update(db).await?;

        debug!(goal_id, ?status, "Goal synchronized");
        goals_updated += 1;
    }

    if !newly_completed.is_empty() {
        info!(?newly_completed, "Goals completed by wallet balance");
    }

    Ok(GoalSyncResult {
        wallet_id,
        balance,
        goals_checked,
        goals_updated,
        newly_completed,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::goal;
    use crate::errors::Error;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_sync_sets_amount_and_status() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let near = create_linked_goal(&db, "Near", dec!(100), wallet.id).await?;
        let far = create_linked_goal(&db, "Far", dec!(1000), wallet.id).await?;

        wallet::adjust_balance_atomic(&db, TEST_OWNER, wallet.id, dec!(150)).await?;
        let result = sync_goals_for_wallet(&db, TEST_OWNER, wallet.id).await?;

        assert_eq!(result.balance, dec!(150));
        assert_eq!(result.goals_checked, 2);
        assert_eq!(result.goals_updated, 2);
        assert_eq!(result.newly_completed, vec![near.id]);

        let near = reload_goal(&db, near.id).await?;
        let far = reload_goal(&db, far.id).await?;
        assert_eq!(near.current_amount, dec!(150));
        assert_eq!(near.status, GoalStatus::Completed);
        assert_eq!(far.current_amount, dec!(150));
        assert_eq!(far.status, GoalStatus::Active);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        create_linked_goal(&db, "Goal", dec!(100), wallet.id).await?;
        wallet::adjust_balance_atomic(&db, TEST_OWNER, wallet.id, dec!(40)).await?;

        let first = sync_goals_for_wallet(&db, TEST_OWNER, wallet.id).await?;
        assert_eq!(first.goals_updated, 1);

        let second = sync_goals_for_wallet(&db, TEST_OWNER, wallet.id).await?;
        assert_eq!(second.goals_checked, 1);
        assert_eq!(second.goals_updated, 0);
        assert!(second.newly_completed.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_reverts_completed_goal_when_balance_drops() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let linked = create_linked_goal(&db, "Goal", dec!(100), wallet.id).await?;

        wallet::adjust_balance_atomic(&db, TEST_OWNER, wallet.id, dec!(100)).await?;
        sync_goals_for_wallet(&db, TEST_OWNER, wallet.id).await?;
        assert_eq!(reload_goal(&db, linked.id).await?.status, GoalStatus::Completed);

        wallet::adjust_balance_atomic(&db, TEST_OWNER, wallet.id, dec!(-1)).await?;
        sync_goals_for_wallet(&db, TEST_OWNER, wallet.id).await?;

        let linked = reload_goal(&db, linked.id).await?;
        assert_eq!(linked.current_amount, dec!(99));
        assert_eq!(linked.status, GoalStatus::Active);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_skips_cancelled_and_unlinked_goals() -> Result<()> {
        let (db, wallet) = setup_with_wallet().await?;
        let cancelled = create_linked_goal(&db, "Cancelled", dec!(10), wallet.id).await?;
        goal::cancel_goal(&db, TEST_OWNER, cancelled.id).await?;
        let unlinked = create_test_goal(&db, "Manual", dec!(10)).await?;

        wallet::adjust_balance_atomic(&db, TEST_OWNER, wallet.id, dec!(500)).await?;
        let result = sync_goals_for_wallet(&db, TEST_OWNER, wallet.id).await?;
        assert_eq!(result.goals_checked, 0);

        let cancelled = reload_goal(&db, cancelled.id).await?;
        assert_eq!(cancelled.status, GoalStatus::Cancelled);
        assert_eq!(cancelled.current_amount, Decimal::ZERO);

        let unlinked = reload_goal(&db, unlinked.id).await?;
        assert_eq!(unlinked.current_amount, Decimal::ZERO);
        assert_eq!(unlinked.status, GoalStatus::Active);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_ignores_other_wallets() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_wallet(&db, "A").await?;
        let b = create_test_wallet(&db, "B").await?;
        let goal_b = create_linked_goal(&db, "B goal", dec!(10), b.id).await?;

        wallet::adjust_balance_atomic(&db, TEST_OWNER, a.id, dec!(50)).await?;
        sync_goals_for_wallet(&db, TEST_OWNER, a.id).await?;

        assert_eq!(reload_goal(&db, goal_b.id).await?.current_amount, Decimal::ZERO);

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_unknown_wallet() -> Result<()> {
        let db = setup_test_db().await?;
        let result = sync_goals_for_wallet(&db, TEST_OWNER, 77).await;
        assert!(matches!(result, Err(Error::WalletNotFound { id: 77 })));
        Ok(())
    }
}
