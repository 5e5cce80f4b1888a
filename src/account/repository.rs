//! Account queries and the balance mutation primitive used by the transaction service.

use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use time::OffsetDateTime;

use crate::{
    Error,
    account::core::{ACCOUNT_COLUMNS, Account, AccountId, AccountKind, map_account_row},
    money::Money,
    user::UserId,
};

/// The fields needed to open an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    pub initial_balance: Money,
    pub color: Option<String>,
}

/// Account access bound to a connection or to an open database transaction.
///
/// Use [AccountRepository::begin] to open an atomic scope and [AccountRepository::with_tx] to
/// run queries inside it. Dropping the scope without committing rolls it back.
#[derive(Debug, Clone, Copy)]
pub struct AccountRepository<'c> {
    connection: &'c Connection,
}

impl<'c> AccountRepository<'c> {
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }

    /// Open an atomic scope that takes the write lock up front.
    ///
    /// Holding the lock from the start means concurrent writers queue behind each other instead
    /// of failing with `SQLITE_BUSY` when they try to upgrade a read lock.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the scope cannot be opened, e.g. because one is already open
    /// on this connection.
    pub fn begin(&self) -> Result<Transaction<'c>, Error> {
        Transaction::new_unchecked(self.connection, TransactionBehavior::Immediate)
            .map_err(Error::from)
    }

    /// A view of the accounts bound to the scope `tx`, so its writes commit or roll back with it.
    pub fn with_tx<'t>(&self, tx: &'t Transaction<'_>) -> AccountRepository<'t> {
        AccountRepository::new(tx)
    }

    /// Get an account owned by `owner` that has not been deleted.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the account does not exist, belongs to another user or was
    /// deleted.
    pub fn find_by_id(&self, id: AccountId, owner: UserId) -> Result<Account, Error> {
        self.connection
            .prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts
                 WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL"
            ))?
            .query_row(params![id, owner.as_i64()], map_account_row)
            .map_err(Error::from)
    }

    /// Get an account regardless of who owns it.
    ///
    /// Callers must do their own access checks, e.g. against account shares.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the account does not exist or was deleted.
    pub fn find_by_id_unscoped(&self, id: AccountId) -> Result<Account, Error> {
        self.connection
            .prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1 AND deleted_at IS NULL"
            ))?
            .query_row([id], map_account_row)
            .map_err(Error::from)
    }

    /// Get the accounts owned by `owner`, oldest first.
    pub fn list(&self, owner: UserId) -> Result<Vec<Account>, Error> {
        self.connection
            .prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts
                 WHERE user_id = ?1 AND deleted_at IS NULL
                 ORDER BY id ASC"
            ))?
            .query_map([owner.as_i64()], map_account_row)?
            .map(|maybe_account| maybe_account.map_err(Error::from))
            .collect()
    }

    /// Add `delta` to the balance of account `id`.
    ///
    /// The addition happens inside the database so concurrent deltas are never lost.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no account has the ID `id`, or [Error::InvalidRequest] if
    /// the new balance does not fit in 64 bits of cents.
    pub fn update_balance(&self, id: AccountId, delta: Money) -> Result<(), Error> {
        let rows_affected = self
            .connection
            .execute(
                "UPDATE accounts SET balance = balance + ?1 WHERE id = ?2",
                params![delta, id],
            )
            .map_err(|error| map_balance_overflow(error, id))?;

        if rows_affected != 1 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    /// Insert an account with its balance set to zero.
    ///
    /// The initial balance is recorded on the row but only reaches `balance` through the
    /// initial transaction, see [crate::transaction::create_account].
    pub(crate) fn insert(
        &self,
        owner: UserId,
        new_account: &NewAccount,
        created_at: OffsetDateTime,
    ) -> Result<Account, Error> {
        self.connection
            .prepare(&format!(
                "INSERT INTO accounts
                 (user_id, name, kind, currency, initial_balance, balance, color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)
                 RETURNING {ACCOUNT_COLUMNS}"
            ))?
            .query_row(
                params![
                    owner.as_i64(),
                    new_account.name,
                    new_account.kind,
                    new_account.currency,
                    new_account.initial_balance,
                    new_account.color,
                    created_at,
                ],
                map_account_row,
            )
            .map_err(Error::from)
    }

    /// Change the display name and color of an account.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `owner` has no live account with the ID `id`.
    pub fn update_details(
        &self,
        id: AccountId,
        owner: UserId,
        name: &str,
        color: Option<&str>,
    ) -> Result<Account, Error> {
        let rows_affected = self.connection.execute(
            "UPDATE accounts SET name = ?1, color = ?2
             WHERE id = ?3 AND user_id = ?4 AND deleted_at IS NULL",
            params![name, color, id, owner.as_i64()],
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        self.find_by_id(id, owner)
    }

    /// Mark an account as deleted. Its transactions are kept.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `owner` has no live account with the ID `id`.
    pub fn soft_delete(
        &self,
        id: AccountId,
        owner: UserId,
        deleted_at: OffsetDateTime,
    ) -> Result<(), Error> {
        let rows_affected = self.connection.execute(
            "UPDATE accounts SET deleted_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
            params![deleted_at, id, owner.as_i64()],
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}

// SQLite turns an overflowing integer sum into a REAL, which the CHECK on `balance` rejects.
fn map_balance_overflow(error: rusqlite::Error, id: AccountId) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_CHECK,
            },
            _,
        ) => Error::InvalidRequest(format!("the balance of account {id} would overflow")),
        error => error.into(),
    }
}
