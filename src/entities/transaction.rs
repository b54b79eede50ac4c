//! Transaction entity - A single booked movement of money against one wallet.
//!
//! Amounts are always positive; the `transaction_type` decides whether the
//! amount is added to (`income`) or subtracted from (`expense`) the wallet.
//! Rows produced by the recurring materializer carry the `recurring_id` of
//! their definition, and `(recurring_id, date)` is unique so one occurrence
//! can only ever be booked once.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a transaction relative to its wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming into the wallet
    #[sea_orm(string_value = "income")]
    Income,
    /// Money leaving the wallet
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl TransactionType {
    /// Returns the balance delta this transaction type applies for `amount`.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns this transaction
    #[sea_orm(indexed)]
    pub owner_id: String,
    /// Wallet the transaction is booked against
    pub wallet_id: i64,
    /// Optional category, a weak reference owned by the presentation layer
    pub category_id: Option<i64>,
    /// Positive transaction amount
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Booking date
    pub date: Date,
    /// Free-form description
    pub description: String,
    /// Recurring definition this row was materialized from, if any
    pub recurring_id: Option<i64>,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one wallet
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
