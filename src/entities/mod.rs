//! Entity module - Contains all SeaORM entity definitions for the ledger store.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod distribution_template;
pub mod distribution_template_allocation;
pub mod goal;
pub mod recurring_transaction;
pub mod transaction;
pub mod wallet;

// Re-export specific types to avoid conflicts
pub use distribution_template::{
    Column as DistributionTemplateColumn, Entity as DistributionTemplate,
    Model as DistributionTemplateModel,
};
pub use distribution_template_allocation::{
    Column as TemplateAllocationColumn, Entity as TemplateAllocation,
    Model as TemplateAllocationModel,
};
pub use goal::{Column as GoalColumn, Entity as Goal, GoalStatus, Model as GoalModel};
pub use recurring_transaction::{
    Column as RecurringColumn, Entity as RecurringTransaction, Frequency,
    Model as RecurringModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
    TransactionType,
};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel, WalletType};
