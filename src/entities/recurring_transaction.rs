//! Recurring transaction entity - A schedule that periodically materializes
//! into a real ledger transaction.
//!
//! `next_date` is the next due occurrence and is advanced by one period each
//! time an occurrence is booked. `is_active` is a soft pause flag; definitions
//! are never deleted by processing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::transaction::TransactionType;

/// How often a recurring definition comes due.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day
    #[sea_orm(string_value = "daily")]
    Daily,
    /// Every seven days
    #[sea_orm(string_value = "weekly")]
    Weekly,
    /// Same day of every calendar month
    #[sea_orm(string_value = "monthly")]
    Monthly,
    /// Same day of every calendar year
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

/// Recurring transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_transactions")]
pub struct Model {
    /// Unique identifier for the definition
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns this definition
    #[sea_orm(indexed)]
    pub owner_id: String,
    /// Wallet every occurrence is booked against
    pub wallet_id: i64,
    /// Optional category copied onto every occurrence
    pub category_id: Option<i64>,
    /// Positive amount of each occurrence
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Description copied onto every occurrence
    pub description: String,
    /// Schedule period
    pub frequency: Frequency,
    /// Next due occurrence
    pub next_date: Date,
    /// Soft pause flag; inactive definitions are skipped
    pub is_active: bool,
    /// When the definition was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `RecurringTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each definition books into one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id",
        on_delete = "Cascade"
    )]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
