//! Ledger operations, independent of any presentation layer.
//!
//! Every function takes the owning account's id explicitly and only ever sees
//! that owner's rows.

pub mod distribution;
pub mod goal;
pub mod recurring;
pub mod schedule;
pub mod sync;
pub mod template;
pub mod transaction;
pub mod wallet;
