//! Defines the account model and its table.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, money::Money, user::UserId};

pub type AccountId = i64;

/// What an account is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// A current account.
    Checking,
    /// A savings account.
    Savings,
    /// A credit card.
    Credit,
    /// Cash on hand.
    Cash,
}

impl AccountKind {
    /// The name stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::Credit => "credit",
            AccountKind::Cash => "cash",
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checking" => Ok(AccountKind::Checking),
            "savings" => Ok(AccountKind::Savings),
            "credit" => Ok(AccountKind::Credit),
            "cash" => Ok(AccountKind::Cash),
            other => Err(Error::InvalidRequest(format!("unknown account kind \"{other}\""))),
        }
    }
}

impl ToSql for AccountKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A bank account, credit card or wallet owned by a user.
///
/// `balance` always equals `initial_balance` plus the signed sum of the account's transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserId,
    /// The display name.
    pub name: String,
    /// What the account is used for.
    pub kind: AccountKind,
    /// An opaque currency tag, e.g. "BRL".
    pub currency: String,
    /// The balance when the account was created.
    pub initial_balance: Money,
    /// The current balance.
    pub balance: Money,
    /// An optional display color, e.g. "#8a05be".
    pub color: Option<String>,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the account was deleted, if it has been.
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

/// The columns selected by [map_account_row], in order.
pub const ACCOUNT_COLUMNS: &str = "id, user_id, name, kind, currency, initial_balance, balance, \
    color, created_at, deleted_at";

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            currency TEXT NOT NULL,
            initial_balance INTEGER NOT NULL,
            balance INTEGER NOT NULL CHECK (typeof(balance) = 'integer'),
            color TEXT,
            created_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY(user_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_user_id ON accounts(user_id)",
        (),
    )?;

    Ok(())
}

pub fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        kind: row.get(3)?,
        currency: row.get(4)?,
        initial_balance: row.get(5)?,
        balance: row.get(6)?,
        color: row.get(7)?,
        created_at: row.get(8)?,
        deleted_at: row.get(9)?,
    })
}
