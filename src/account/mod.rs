//! Accounts, the repository the transaction service posts balances through, and their routes.

mod core;
mod endpoints;
mod repository;

pub use core::{Account, AccountId, AccountKind, create_account_table, map_account_row};
pub use endpoints::{
    create_account_endpoint, delete_account_endpoint, get_account_endpoint,
    get_account_transactions_endpoint, list_accounts_endpoint, update_account_endpoint,
};
pub use repository::{AccountRepository, NewAccount};
