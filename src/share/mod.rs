//! Sharing accounts with other users for reading.

mod core;
mod endpoints;

pub use core::{
    accept_invitation, create_share_tables, get_shared_account_transactions, invite,
    list_shared_accounts, list_shares, revoke_share,
};
pub use endpoints::{
    accept_invitation_endpoint, get_shared_account_transactions_endpoint, invite_endpoint,
    list_shared_accounts_endpoint, list_shares_endpoint, revoke_share_endpoint,
};
