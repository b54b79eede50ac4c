//! Wallet entity - A named money container with an authoritative balance.
//!
//! `balance` is denormalized: every mutation that books a transaction against
//! the wallet adjusts it in the same store transaction, so it always equals
//! `initial_balance` plus the signed sum of the wallet's transactions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of money container a wallet represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum WalletType {
    /// Physical cash
    #[sea_orm(string_value = "cash")]
    #[serde(rename = "cash")]
    Cash,
    /// Bank account
    #[sea_orm(string_value = "bank")]
    #[serde(rename = "bank")]
    Bank,
    /// Mobile or online wallet
    #[sea_orm(string_value = "e-wallet")]
    #[serde(rename = "e-wallet")]
    EWallet,
}

/// Wallet database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// Unique identifier for the wallet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns this wallet
    #[sea_orm(indexed)]
    pub owner_id: String,
    /// Display name (e.g., "Main Bank", "Pocket Cash")
    pub name: String,
    /// Kind of wallet
    pub wallet_type: WalletType,
    /// Balance the wallet was opened with
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub initial_balance: Decimal,
    /// Current authoritative balance
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub balance: Decimal,
    /// ISO currency code all amounts in this wallet are expressed in
    pub currency: String,
    /// Optional icon identifier used by the presentation layer
    pub icon: Option<String>,
    /// When the wallet was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Wallet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One wallet has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    /// One wallet has many recurring definitions
    #[sea_orm(has_many = "super::recurring_transaction::Entity")]
    RecurringTransactions,
    /// One wallet can back many goals
    #[sea_orm(has_many = "super::goal::Entity")]
    Goals,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::recurring_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringTransactions.def()
    }
}

impl Related<super::goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
