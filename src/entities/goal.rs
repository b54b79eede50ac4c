//! Goal entity - A savings target, optionally mirrored from a wallet balance.
//!
//! When `wallet_id` is set, `current_amount` is owned by the goal synchronizer
//! and always reflects the wallet's balance. Unlinked goals are plain counters
//! changed only through explicit add/withdraw operations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    /// Still saving towards the target
    #[sea_orm(string_value = "active")]
    Active,
    /// Current amount has reached the target
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Abandoned by the user; synchronization leaves it alone
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl GoalStatus {
    /// Status implied by progress for a goal that is not cancelled.
    #[must_use]
    pub fn from_progress(current: Decimal, target: Decimal) -> Self {
        if current >= target {
            Self::Completed
        } else {
            Self::Active
        }
    }
}

/// Goal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    /// Unique identifier for the goal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns this goal
    #[sea_orm(indexed)]
    pub owner_id: String,
    /// Display name
    pub name: String,
    /// Amount the goal is complete at
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub target_amount: Decimal,
    /// Progress so far
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub current_amount: Decimal,
    /// Optional deadline
    pub target_date: Option<Date>,
    /// Lifecycle state
    pub status: GoalStatus,
    /// Wallet whose balance drives `current_amount`, if linked
    pub wallet_id: Option<i64>,
    /// When the goal was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Goal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A goal may mirror one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id",
        on_delete = "SetNull"
    )]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
