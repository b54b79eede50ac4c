//! Unified error type for the ledger engine.
//!
//! Errors fall into two groups: validation errors, which are raised before any
//! write reaches the store, and store errors wrapping [`sea_orm::DbErr`].

use rust_decimal::Decimal;
use thiserror::Error;

/// All errors produced by the ledger engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// The underlying store rejected an operation
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required input was missing or malformed
    #[error("Invalid input: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// An amount was zero, negative or otherwise out of range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Distribution allocations do not add up to the declared total
    #[error("Allocations sum to {allocated} but the total is {total}")]
    AllocationMismatch {
        /// Declared distribution total
        total: Decimal,
        /// Sum of all allocation amounts
        allocated: Decimal,
    },

    /// A distribution had no allocation with a positive amount
    #[error("Distribution has no positive allocation")]
    EmptyDistribution,

    /// A frequency string did not name a supported schedule
    #[error("Unsupported frequency: {value}")]
    InvalidFrequency {
        /// The rejected input
        value: String,
    },

    /// A distribution template is malformed
    #[error("Invalid distribution template: {message}")]
    InvalidTemplate {
        /// What is wrong with the template
        message: String,
    },

    /// Wallet does not exist or belongs to another owner
    #[error("Wallet not found: {id}")]
    WalletNotFound {
        /// Requested wallet id
        id: i64,
    },

    /// Transaction does not exist or belongs to another owner
    #[error("Transaction not found: {id}")]
    TransactionNotFound {
        /// Requested transaction id
        id: i64,
    },

    /// Recurring definition does not exist or belongs to another owner
    #[error("Recurring transaction not found: {id}")]
    RecurringNotFound {
        /// Requested recurring definition id
        id: i64,
    },

    /// Goal does not exist or belongs to another owner
    #[error("Goal not found: {id}")]
    GoalNotFound {
        /// Requested goal id
        id: i64,
    },

    /// Distribution template does not exist or belongs to another owner
    #[error("Distribution template not found: {id}")]
    TemplateNotFound {
        /// Requested template id
        id: i64,
    },

    /// Manual progress changes are not allowed on wallet-linked goals
    #[error("Goal {goal_id} is linked to wallet {wallet_id}; its progress follows the wallet balance")]
    GoalLinkedToWallet {
        /// Goal being modified
        goal_id: i64,
        /// Wallet the goal mirrors
        wallet_id: i64,
    },

    /// The goal was cancelled and cannot be modified
    #[error("Goal {goal_id} is cancelled")]
    GoalCancelled {
        /// Goal being modified
        goal_id: i64,
    },

    /// A withdrawal would take the goal below zero
    #[error("Cannot withdraw {requested} from goal holding {current}")]
    InsufficientGoalFunds {
        /// Current goal amount
        current: Decimal,
        /// Amount requested for withdrawal
        requested: Decimal,
    },
}

impl Error {
    /// Returns `true` for errors raised by input validation, before any write.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::Database(_) | Self::Io(_))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
