//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, account::AccountId, category::CategoryId, money::Money, user::UserId};

pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// How a transaction moves money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming into the source account.
    Income,
    /// Money leaving the source account.
    Expense,
    /// Money moving from the source account to the destination account.
    Transfer,
    /// The opening balance of an account. Only created together with the account.
    Initial,
}

impl TransactionKind {
    /// The name stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Initial => "initial",
        }
    }

    /// The change to the source account's balance when a transaction of this kind is posted.
    pub fn source_delta(self, amount: Money) -> Money {
        match self {
            TransactionKind::Income | TransactionKind::Initial => amount,
            TransactionKind::Expense | TransactionKind::Transfer => -amount,
        }
    }

    /// Whether posting a transaction of this kind takes money out of the source account.
    pub fn is_outflow(self) -> bool {
        matches!(self, TransactionKind::Expense | TransactionKind::Transfer)
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            "transfer" => Ok(TransactionKind::Transfer),
            "initial" => Ok(TransactionKind::Initial),
            other => Err(Error::InvalidRequest(format!(
                "unknown transaction kind \"{other}\""
            ))),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An income, expense, transfer or opening balance that has been posted to an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money comes from (expense, transfer) or goes to (income, initial).
    pub account_id: AccountId,
    /// The account receiving a transfer.
    pub to_account_id: Option<AccountId>,
    /// How the transaction moves money.
    pub kind: TransactionKind,
    /// The amount of money moved, always positive.
    pub amount: Money,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The categories the transaction is filed under.
    pub category_ids: Vec<CategoryId>,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A transaction that has not been posted yet.
///
/// This is what statement extractors produce and what the transaction service accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// The source account.
    pub account_id: AccountId,
    /// The destination account, required for transfers.
    #[serde(default)]
    pub to_account_id: Option<AccountId>,
    /// How the transaction moves money.
    pub kind: TransactionKind,
    /// The amount of money moved, must be positive.
    pub amount: Money,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// A text description, may be empty.
    #[serde(default)]
    pub description: String,
    /// The categories to file the transaction under.
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl NewTransaction {
    /// Create a transaction without a destination or categories.
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Money,
        date: OffsetDateTime,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            to_account_id: None,
            kind,
            amount,
            date,
            description: description.into(),
            category_ids: Vec::new(),
        }
    }

    /// Set the destination account of a transfer.
    pub fn to_account(mut self, to_account_id: AccountId) -> Self {
        self.to_account_id = Some(to_account_id);
        self
    }

    /// Set the categories to file the transaction under.
    pub fn categories(mut self, category_ids: Vec<CategoryId>) -> Self {
        self.category_ids = category_ids;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str =
    "id, account_id, to_account_id, kind, amount, date, description, created_at, updated_at";

/// [TRANSACTION_COLUMNS] qualified with the `t` alias, for queries that join other tables.
const QUALIFIED_TRANSACTION_COLUMNS: &str = "t.id, t.account_id, t.to_account_id, t.kind, \
    t.amount, t.date, t.description, t.created_at, t.updated_at";

/// Insert the transaction row and its category links.
///
/// This does not touch account balances, use [crate::transaction::create_transaction] for that.
///
/// # Errors
/// Returns [Error::SqlError] if a constraint fails, e.g. the amount is not positive.
pub(crate) fn insert_transaction(
    new_transaction: &NewTransaction,
    recorded_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let recorded_at = recorded_at.to_offset(UtcOffset::UTC);

    let mut transaction = connection
        .prepare(&format!(
            "INSERT INTO transactions
             (account_id, to_account_id, kind, amount, date, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            params![
                new_transaction.account_id,
                new_transaction.to_account_id,
                new_transaction.kind,
                new_transaction.amount,
                new_transaction.date.to_offset(UtcOffset::UTC),
                new_transaction.description,
                recorded_at,
            ],
            map_transaction_row,
        )?;

    link_categories(transaction.id, &new_transaction.category_ids, connection)?;
    transaction.category_ids = get_category_ids(transaction.id, connection)?;

    Ok(transaction)
}

fn link_categories(
    transaction_id: TransactionId,
    category_ids: &[CategoryId],
    connection: &Connection,
) -> Result<(), Error> {
    let mut statement = connection.prepare(
        "INSERT OR IGNORE INTO transaction_categories (transaction_id, category_id)
         VALUES (?1, ?2)",
    )?;

    for category_id in category_ids {
        statement.execute(params![transaction_id, category_id])?;
    }

    Ok(())
}

/// Retrieve a transaction whose source account is owned by `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction on one of `owner`'s accounts,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    owner: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let mut transaction = connection
        .prepare(&format!(
            "SELECT {QUALIFIED_TRANSACTION_COLUMNS} FROM transactions t
             INNER JOIN accounts a ON a.id = t.account_id
             WHERE t.id = ?1 AND a.user_id = ?2"
        ))?
        .query_row(params![id, owner.as_i64()], map_transaction_row)?;

    transaction.category_ids = get_category_ids(transaction.id, connection)?;

    Ok(transaction)
}

/// Retrieve the transactions that move money into or out of `account_id`, newest first.
///
/// The caller is responsible for checking that the account may be read.
pub fn list_transactions_by_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions: Vec<Transaction> = connection
        .prepare(&format!(
            "SELECT {QUALIFIED_TRANSACTION_COLUMNS} FROM transactions t
             WHERE t.account_id = ?1 OR t.to_account_id = ?1
             ORDER BY t.date DESC, t.id DESC"
        ))?
        .query_map([account_id], map_transaction_row)?
        .collect::<Result<_, _>>()?;

    with_category_ids(transactions, connection)
}

/// Retrieve the most recent transactions across all of `owner`'s live accounts.
pub fn list_recent_transactions(
    owner: UserId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions: Vec<Transaction> = connection
        .prepare(&format!(
            "SELECT {QUALIFIED_TRANSACTION_COLUMNS} FROM transactions t
             INNER JOIN accounts a ON a.id = t.account_id
             WHERE a.user_id = ?1 AND a.deleted_at IS NULL
             ORDER BY t.date DESC, t.id DESC
             LIMIT ?2"
        ))?
        .query_map(params![owner.as_i64(), limit], map_transaction_row)?
        .collect::<Result<_, _>>()?;

    with_category_ids(transactions, connection)
}

/// Delete the transaction row. Category links are removed by the foreign key cascade.
///
/// Balances are not touched, use [crate::transaction::delete_transaction] for that.
pub(crate) fn delete_transaction_row(
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM transactions WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the IDs of the categories linked to a transaction, in ascending order.
pub fn get_category_ids(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<CategoryId>, Error> {
    connection
        .prepare(
            "SELECT category_id FROM transaction_categories
             WHERE transaction_id = ?1 ORDER BY category_id ASC",
        )?
        .query_map([transaction_id], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

fn with_category_ids(
    mut transactions: Vec<Transaction>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    for transaction in &mut transactions {
        transaction.category_ids = get_category_ids(transaction.id, connection)?;
    }

    Ok(transactions)
}

/// Create the transaction tables in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                to_account_id INTEGER,
                kind TEXT NOT NULL,
                amount INTEGER NOT NULL CHECK (amount > 0),
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(account_id) REFERENCES accounts(id),
                FOREIGN KEY(to_account_id) REFERENCES accounts(id)
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_account_date
         ON transactions(account_id, date)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_to_account
         ON transactions(to_account_id)",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS transaction_categories (
                transaction_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                PRIMARY KEY(transaction_id, category_id),
                FOREIGN KEY(transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row selected with the transaction columns to a [Transaction].
///
/// Category IDs are loaded separately.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        to_account_id: row.get(2)?,
        kind: row.get(3)?,
        amount: row.get(4)?,
        date: row.get(5)?,
        description: row.get(6)?,
        category_ids: Vec::new(),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
