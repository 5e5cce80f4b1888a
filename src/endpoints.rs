//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/accounts/{account_id}', use [format_endpoint].

use std::fmt::Display;

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route to register users.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route to create and list accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to get, edit and delete a single account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";
/// The route to list the transactions of an account.
pub const ACCOUNT_TRANSACTIONS: &str = "/api/accounts/{account_id}/transactions";
/// The route to invite another user to view an account.
pub const ACCOUNT_INVITATIONS: &str = "/api/accounts/{account_id}/invitations";
/// The route to list who can view an account.
pub const ACCOUNT_SHARES: &str = "/api/accounts/{account_id}/shares";
/// The route to stop sharing an account with a user.
pub const ACCOUNT_SHARE: &str = "/api/accounts/{account_id}/shares/{user_id}";
/// The route to accept an invitation.
pub const ACCEPT_INVITATION: &str = "/api/invitations/{token}/accept";
/// The route to list the accounts shared with the current user.
pub const SHARED_ACCOUNTS: &str = "/api/shared_accounts";
/// The route to list the transactions of an account shared with the current user.
pub const SHARED_ACCOUNT_TRANSACTIONS: &str = "/api/shared_accounts/{account_id}/transactions";
/// The route to post transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to get and delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the current user's summary.
pub const DASHBOARD: &str = "/api/dashboard";
/// The route to create and list categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to get, rename and delete a category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to create and list categorization rules.
pub const RULES: &str = "/api/rules";
/// The route to get, edit and delete a categorization rule.
pub const RULE: &str = "/api/rules/{rule_id}";
/// The route to categorize uncategorized transactions with the current user's rules.
pub const APPLY_RULES: &str = "/api/rules/apply";
/// The route to list the statement extractors.
pub const EXTRACTORS: &str = "/api/extractors";
/// The route to parse a statement without saving it.
pub const IMPORT_PREVIEW: &str = "/api/import/preview";
/// The route to import a statement.
pub const IMPORT: &str = "/api/import";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// Call this once per parameter for paths with more than one.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let param_start = match endpoint_path.find('{') {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
