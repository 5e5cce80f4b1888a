//! Posting and deleting transactions together with their effect on account balances.
//!
//! Every mutation here runs inside one database transaction: the transaction row, the balance
//! updates of the accounts involved and the category links are committed together or not at all.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    account::{Account, AccountRepository, NewAccount},
    category::ensure_categories_owned,
    money::Money,
    transaction::core::{
        NewTransaction, Transaction, TransactionId, TransactionKind, delete_transaction_row,
        get_transaction, insert_transaction,
    },
    user::UserId,
};

/// The description given to the transaction that opens an account.
pub const INITIAL_BALANCE_DESCRIPTION: &str = "Initial Balance";

/// Post a transaction on behalf of `owner` and update the balances it affects.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the source or destination account is not one of `owner`'s live
///   accounts, or a category is not one of `owner`'s categories,
/// - [Error::InvalidRequest] if the amount is not positive, the kind is `initial`, or the
///   destination is missing, present on a non-transfer or equal to the source,
/// - [Error::InsufficientFunds] if an expense or transfer exceeds the source balance,
/// - or [Error::SqlError] if the database fails, in which case nothing is persisted.
pub fn create_transaction(
    new_transaction: &NewTransaction,
    owner: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let tx = AccountRepository::new(connection).begin()?;
    let transaction = create_transaction_in_scope(new_transaction, owner, &tx)?;
    tx.commit()?;

    tracing::info!(
        "posted {} transaction {} of {} on account {}",
        transaction.kind,
        transaction.id,
        transaction.amount,
        transaction.account_id
    );

    Ok(transaction)
}

/// Post a transaction inside a scope opened by the caller.
///
/// Nothing is committed here. If this returns an error the caller must drop `tx` without
/// committing.
pub(crate) fn create_transaction_in_scope(
    new_transaction: &NewTransaction,
    owner: UserId,
    tx: &rusqlite::Transaction<'_>,
) -> Result<Transaction, Error> {
    let accounts = AccountRepository::new(tx);
    let source = accounts.find_by_id(new_transaction.account_id, owner)?;

    if !new_transaction.amount.is_positive() {
        return Err(Error::InvalidRequest(format!(
            "the amount must be greater than zero, got {}",
            new_transaction.amount
        )));
    }

    if new_transaction.kind == TransactionKind::Initial {
        return Err(Error::InvalidRequest(
            "initial transactions can only be created together with their account".to_owned(),
        ));
    }

    let destination = check_destination(new_transaction, &source, owner, &accounts)?;
    ensure_categories_owned(&new_transaction.category_ids, owner, tx)?;

    if new_transaction.kind.is_outflow() && source.balance < new_transaction.amount {
        return Err(Error::InsufficientFunds);
    }

    let transaction = insert_transaction(new_transaction, OffsetDateTime::now_utc(), tx)?;

    accounts.update_balance(
        source.id,
        new_transaction.kind.source_delta(new_transaction.amount),
    )?;

    if let Some(destination) = destination {
        accounts.update_balance(destination.id, new_transaction.amount)?;
    }

    Ok(transaction)
}

fn check_destination(
    new_transaction: &NewTransaction,
    source: &Account,
    owner: UserId,
    accounts: &AccountRepository<'_>,
) -> Result<Option<Account>, Error> {
    match (new_transaction.kind, new_transaction.to_account_id) {
        (TransactionKind::Transfer, None) => Err(Error::InvalidRequest(
            "a transfer needs a destination account".to_owned(),
        )),
        (TransactionKind::Transfer, Some(to_account_id)) if to_account_id == source.id => Err(
            Error::InvalidRequest("cannot transfer to the source account".to_owned()),
        ),
        (TransactionKind::Transfer, Some(to_account_id)) => {
            accounts.find_by_id(to_account_id, owner).map(Some)
        }
        (_, Some(_)) => Err(Error::InvalidRequest(
            "only transfers have a destination account".to_owned(),
        )),
        (_, None) => Ok(None),
    }
}

/// Delete one of `owner`'s transactions and reverse its effect on balances.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or its source account belongs to
/// another user, or [Error::SqlError] if the database fails, in which case nothing changes.
pub fn delete_transaction(
    id: TransactionId,
    owner: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let repository = AccountRepository::new(connection);
    let tx = repository.begin()?;
    let accounts = repository.with_tx(&tx);
    let transaction = get_transaction(id, owner, &tx)?;

    accounts.update_balance(
        transaction.account_id,
        -transaction.kind.source_delta(transaction.amount),
    )?;

    if let Some(to_account_id) = transaction.to_account_id {
        accounts.update_balance(to_account_id, -transaction.amount)?;
    }

    delete_transaction_row(id, &tx)?;
    tx.commit()?;

    tracing::info!(
        "deleted {} transaction {} of {} on account {}",
        transaction.kind,
        transaction.id,
        transaction.amount,
        transaction.account_id
    );

    Ok(transaction)
}

/// Open an account for `owner`.
///
/// A non-zero initial balance is posted as a single `initial` transaction dated at creation
/// time, so the account row, that transaction and the balance update are committed together.
///
/// # Errors
/// Returns [Error::InvalidRequest] if the name is blank or the initial balance is negative, or
/// [Error::SqlError] if the database fails.
pub fn create_account(
    new_account: &NewAccount,
    owner: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    if new_account.name.trim().is_empty() {
        return Err(Error::InvalidRequest(
            "the account name cannot be empty".to_owned(),
        ));
    }

    if new_account.initial_balance < Money::ZERO {
        return Err(Error::InvalidRequest(
            "the initial balance cannot be negative".to_owned(),
        ));
    }

    let repository = AccountRepository::new(connection);
    let tx = repository.begin()?;
    let accounts = repository.with_tx(&tx);
    let created_at = OffsetDateTime::now_utc();
    let account = accounts.insert(owner, new_account, created_at)?;

    if new_account.initial_balance.is_positive() {
        let initial = NewTransaction::new(
            account.id,
            TransactionKind::Initial,
            new_account.initial_balance,
            created_at,
            INITIAL_BALANCE_DESCRIPTION,
        );
        insert_transaction(&initial, created_at, &tx)?;
        accounts.update_balance(account.id, new_account.initial_balance)?;
    }

    let account = accounts.find_by_id(account.id, owner)?;
    tx.commit()?;

    tracing::info!(
        "opened account {} for user {} with balance {}",
        account.id,
        owner,
        account.balance
    );

    Ok(account)
}



#[cfg(test)]
mod balance_tests {
    use std::{thread, time::Duration};

    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        account::{Account, AccountRepository},
        db::initialize,
        money::Money,
        test_utils::{create_test_account, create_test_user, get_test_connection},
        transaction::{NewTransaction, TransactionKind, list_transactions_by_account},
    };

    use super::{create_transaction, delete_transaction};

    fn balance_of(account: &Account, conn: &Connection) -> Money {
        AccountRepository::new(conn)
            .find_by_id_unscoped(account.id)
            .unwrap()
            .balance
    }

    #[test]
    fn income_that_overflows_the_balance_is_rejected() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let account = create_test_account(owner, Money::from_cents(100), &conn);
        let request = NewTransaction::new(
            account.id,
            TransactionKind::Income,
            Money::from_cents(i64::MAX),
            datetime!(2025-01-01 12:00 UTC),
            "",
        );

        let result = create_transaction(&request, owner, &conn);

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(balance_of(&account, &conn), Money::from_cents(100));
        assert_eq!(list_transactions_by_account(account.id, &conn).unwrap().len(), 1);
        assert_eq!(AccountRepository::new(&conn).list(owner).unwrap().len(), 1);
    }

    #[test]
    fn largest_initial_balance_is_kept_and_cannot_grow() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let account = create_test_account(owner, Money::from_cents(i64::MAX), &conn);
        let request = NewTransaction::new(
            account.id,
            TransactionKind::Income,
            Money::from_cents(1),
            datetime!(2025-01-01 12:00 UTC),
            "",
        );

        let result = create_transaction(&request, owner, &conn);

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(balance_of(&account, &conn), Money::from_cents(i64::MAX));
    }

    #[test]
    fn transfer_that_overflows_the_destination_changes_nothing() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let source = create_test_account(owner, Money::from_cents(10000), &conn);
        let destination = create_test_account(owner, Money::from_cents(i64::MAX - 10), &conn);
        let request = NewTransaction::new(
            source.id,
            TransactionKind::Transfer,
            Money::from_cents(100),
            datetime!(2025-01-01 12:00 UTC),
            "",
        )
        .to_account(destination.id);

        let result = create_transaction(&request, owner, &conn);

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(balance_of(&source, &conn), Money::from_cents(10000));
        assert_eq!(balance_of(&destination, &conn), Money::from_cents(i64::MAX - 10));
        assert_eq!(list_transactions_by_account(source.id, &conn).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_postings_all_reach_the_balance() {
        const THREADS: i64 = 4;
        const POSTINGS_PER_THREAD: i64 = 25;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contas.db");
        let conn = Connection::open(&path).unwrap();
        initialize(&conn).unwrap();
        let owner = create_test_user("owner@example.com", &conn);
        let account = create_test_account(owner, Money::from_cents(10000), &conn);

        let workers: Vec<_> = (0..THREADS)
            .map(|worker| {
                let path = path.clone();
                thread::spawn(move || {
                    let conn = Connection::open(&path).unwrap();
                    conn.busy_timeout(Duration::from_secs(30)).unwrap();

                    for posting in 0..POSTINGS_PER_THREAD {
                        let (kind, cents) = if posting % 2 == 0 {
                            (TransactionKind::Income, 100 * (worker + 1))
                        } else {
                            (TransactionKind::Expense, 50)
                        };
                        let request = NewTransaction::new(
                            account.id,
                            kind,
                            Money::from_cents(cents),
                            datetime!(2025-01-01 12:00 UTC),
                            "",
                        );

                        create_transaction(&request, owner, &conn).unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        let incomes_per_thread = (POSTINGS_PER_THREAD + 1) / 2;
        let expenses_per_thread = POSTINGS_PER_THREAD / 2;
        let expected: i64 = 10000
            + (0..THREADS)
                .map(|worker| {
                    incomes_per_thread * 100 * (worker + 1) - expenses_per_thread * 50
                })
                .sum::<i64>();
        assert_eq!(balance_of(&account, &conn), Money::from_cents(expected));
        assert_eq!(
            list_transactions_by_account(account.id, &conn).unwrap().len() as i64,
            THREADS * POSTINGS_PER_THREAD + 1
        );
    }

    #[test]
    fn balance_is_initial_balance_plus_postings() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let checking = create_test_account(owner, Money::from_cents(50000), &conn);
        let savings = create_test_account(owner, Money::from_cents(1000), &conn);
        let post = |account_id, kind, cents, to: Option<i64>| {
            let request = NewTransaction::new(
                account_id,
                kind,
                Money::from_cents(cents),
                datetime!(2024-08-01 12:00 UTC),
                "",
            );
            let request = match to {
                Some(to) => request.to_account(to),
                None => request,
            };

            create_transaction(&request, owner, &conn).unwrap()
        };

        post(checking.id, TransactionKind::Income, 511283, None);
        let groceries = post(checking.id, TransactionKind::Expense, 25640, None);
        post(checking.id, TransactionKind::Transfer, 100000, Some(savings.id));
        post(savings.id, TransactionKind::Expense, 2999, None);
        post(savings.id, TransactionKind::Transfer, 500, Some(checking.id));
        delete_transaction(groceries.id, owner, &conn).unwrap();

        for account in [&checking, &savings] {
            let postings: Money = list_transactions_by_account(account.id, &conn)
                .unwrap()
                .into_iter()
                .filter(|transaction| transaction.kind != TransactionKind::Initial)
                .map(|transaction| {
                    if transaction.account_id == account.id {
                        transaction.kind.source_delta(transaction.amount)
                    } else {
                        transaction.amount
                    }
                })
                .sum();
            let stored = AccountRepository::new(&conn)
                .find_by_id(account.id, owner)
                .unwrap();

            assert_eq!(stored.balance, stored.initial_balance + postings);
        }
    }
}
