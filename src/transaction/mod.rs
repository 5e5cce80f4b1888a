//! Transactions and their effect on account balances.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the `NewTransaction` request type
//! - Database functions for storing and querying transactions
//! - The service that posts and deletes transactions atomically with balance updates
//! - The dashboard summary and the route handlers

mod core;
mod dashboard;
mod endpoints;
mod service;

pub use core::{
    NewTransaction, Transaction, TransactionId, TransactionKind, create_transaction_table,
    get_transaction, list_recent_transactions, list_transactions_by_account,
};
pub use dashboard::dashboard_summary;
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_dashboard_endpoint,
    get_transaction_endpoint,
};
pub use service::{create_account, create_transaction, delete_transaction};

pub(crate) use service::create_transaction_in_scope;
