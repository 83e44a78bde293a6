//! Data models for the exporter
//!
//! `transaction` is what the Monzo API hands us, `ofx` is what we write out.

pub mod ofx;
pub mod transaction;

// Re-export commonly used types for convenience
pub use ofx::{BankAccount, OfxDocument, StatementTransaction, TransactionType};
pub use transaction::{TransactionList, TransactionRecord};
