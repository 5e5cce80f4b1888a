//! Creates the application's tables.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table, category::create_category_table, rule::create_rule_table,
    share::create_share_tables, transaction::create_transaction_table, user::create_user_table,
};

/// Enable foreign keys and create every table that does not exist yet.
///
/// The tables are created in a single exclusive transaction so a partially initialized database
/// is never left behind.
///
/// # Errors
/// Returns an error if any of the SQL statements fail.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    // Has no effect inside a transaction, so it must come first.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_rule_table(&transaction)?;
    create_share_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Take the lock on the shared connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if another thread panicked while holding the lock.
pub fn lock_connection(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        assert_eq!(initialize(&connection), Ok(()));
        assert_eq!(initialize(&connection), Ok(()));
    }

    #[test]
    fn enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let enabled: i64 = connection
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();

        assert_eq!(enabled, 1);
    }

    #[test]
    fn creates_every_table() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        for table in [
            "users",
            "accounts",
            "transactions",
            "transaction_categories",
            "categories",
            "categorization_rules",
            "account_shares",
            "share_invitations",
        ] {
            let exists = connection
                .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
                .unwrap()
                .exists([table])
                .unwrap();

            assert!(exists, "missing table {table}");
        }
    }
}
