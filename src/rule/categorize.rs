//! Applies categorization rules to transactions.

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::{
    Error,
    category::CategoryId,
    rule::{Rule, list_rules},
    transaction::{NewTransaction, TransactionId},
    user::UserId,
};

/// Statistics about one run of [apply_rules_to_uncategorized].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorizationResult {
    /// Number of transactions that received a category.
    pub transactions_categorized: usize,
}

/// The category of the first rule whose pattern occurs in `description`.
///
/// `rules` must be ordered longest pattern first, as [list_rules] returns them.
pub fn categorize(description: &str, rules: &[Rule]) -> Option<CategoryId> {
    let description = description.to_lowercase();

    rules
        .iter()
        .find(|rule| description.contains(&rule.pattern.to_lowercase()))
        .map(|rule| rule.category_id)
}

/// Give every row without categories the category of its matching rule, if any.
pub fn categorize_new_transactions(transactions: &mut [NewTransaction], rules: &[Rule]) {
    for transaction in transactions
        .iter_mut()
        .filter(|transaction| transaction.category_ids.is_empty())
    {
        if let Some(category_id) = categorize(&transaction.description, rules) {
            transaction.category_ids.push(category_id);
        }
    }
}

/// Apply `owner`'s rules to their transactions that have no category yet.
///
/// All links are written in one database transaction.
///
/// # Errors
/// Returns an [Error::SqlError] if there are database errors during the operation, in which
/// case no transaction is categorized.
pub fn apply_rules_to_uncategorized(
    owner: UserId,
    connection: &Connection,
) -> Result<CategorizationResult, Error> {
    let rules = list_rules(owner, connection)?;
    if rules.is_empty() {
        return Ok(CategorizationResult {
            transactions_categorized: 0,
        });
    }

    let tx = connection.unchecked_transaction()?;
    let uncategorized = get_uncategorized_transactions(owner, &tx)?;
    let mut transactions_categorized = 0;

    {
        let mut statement = tx.prepare(
            "INSERT OR IGNORE INTO transaction_categories (transaction_id, category_id)
             VALUES (?1, ?2)",
        )?;

        for (transaction_id, description) in &uncategorized {
            if let Some(category_id) = categorize(description, &rules) {
                statement.execute(params![transaction_id, category_id])?;
                transactions_categorized += 1;
            }
        }
    }

    tx.commit()?;

    tracing::info!(
        "categorized {transactions_categorized} of {} uncategorized transactions for user {owner}",
        uncategorized.len()
    );

    Ok(CategorizationResult {
        transactions_categorized,
    })
}

fn get_uncategorized_transactions(
    owner: UserId,
    connection: &Connection,
) -> Result<Vec<(TransactionId, String)>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.description FROM transactions t
             INNER JOIN accounts a ON a.id = t.account_id
             WHERE a.user_id = ?1
               AND NOT EXISTS (
                   SELECT 1 FROM transaction_categories tc WHERE tc.transaction_id = t.id
               )",
        )?
        .query_map([owner.as_i64()], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}
