//! The figures shown on a user's landing page.

use rusqlite::{Connection, params};
use serde::Serialize;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    money::Money,
    transaction::{Transaction, TransactionKind, list_recent_transactions},
    user::UserId,
};

/// How many transactions the summary lists.
pub const RECENT_TRANSACTIONS_LIMIT: u32 = 5;

/// A snapshot of a user's finances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// The sum of the balances of the user's live accounts.
    pub total_balance: Money,
    /// Income dated in the current month.
    pub month_income: Money,
    /// Expenses dated in the current month.
    pub month_expense: Money,
    /// The newest transactions, newest first.
    pub recent_transactions: Vec<Transaction>,
}

/// Midnight on the first day of the month containing `now`, in `now`'s offset.
pub fn start_of_month(now: OffsetDateTime) -> OffsetDateTime {
    let first_day = now.date() - Duration::days(i64::from(now.day()) - 1);

    first_day.midnight().assume_offset(now.offset())
}

/// Summarize `owner`'s accounts as of `now`.
///
/// `now` should be in the server's local offset, since that decides where the current month
/// starts.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn dashboard_summary(
    owner: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<DashboardSummary, Error> {
    let month_start = start_of_month(now).to_offset(UtcOffset::UTC);

    let total_balance = connection.query_row(
        "SELECT COALESCE(SUM(balance), 0) FROM accounts
         WHERE user_id = ?1 AND deleted_at IS NULL",
        [owner.as_i64()],
        |row| row.get(0),
    )?;

    Ok(DashboardSummary {
        total_balance,
        month_income: sum_since(owner, TransactionKind::Income, month_start, connection)?,
        month_expense: sum_since(owner, TransactionKind::Expense, month_start, connection)?,
        recent_transactions: list_recent_transactions(
            owner,
            RECENT_TRANSACTIONS_LIMIT,
            connection,
        )?,
    })
}

fn sum_since(
    owner: UserId,
    kind: TransactionKind,
    since: OffsetDateTime,
    connection: &Connection,
) -> Result<Money, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(t.amount), 0) FROM transactions t
             INNER JOIN accounts a ON a.id = t.account_id
             WHERE a.user_id = ?1 AND a.deleted_at IS NULL AND t.kind = ?2 AND t.date >= ?3",
            params![owner.as_i64(), kind, since],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        account::AccountRepository,
        money::Money,
        test_utils::{create_test_account, create_test_user, get_test_connection},
        transaction::{NewTransaction, TransactionKind, create_transaction},
    };

    use super::{dashboard_summary, start_of_month};

    #[test]
    fn month_starts_at_local_midnight() {
        assert_eq!(
            start_of_month(datetime!(2025-03-17 15:42 -3)),
            datetime!(2025-03-01 00:00 -3)
        );
        assert_eq!(
            start_of_month(datetime!(2025-03-01 00:00 -3)),
            datetime!(2025-03-01 00:00 -3)
        );
    }

    #[test]
    fn summarizes_balances_and_current_month() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let other = create_test_user("other@example.com", &conn);
        let checking = create_test_account(owner, Money::from_cents(100000), &conn);
        let savings = create_test_account(owner, Money::from_cents(50000), &conn);
        let closed = create_test_account(owner, Money::from_cents(999), &conn);
        create_test_account(other, Money::from_cents(777), &conn);
        AccountRepository::new(&conn)
            .soft_delete(closed.id, owner, datetime!(2025-03-02 00:00 UTC))
            .unwrap();
        let post = |account_id, kind, cents, date| {
            create_transaction(
                &NewTransaction::new(account_id, kind, Money::from_cents(cents), date, ""),
                owner,
                &conn,
            )
            .unwrap()
        };

        // 00:30 on 1 March in São Paulo.
        post(checking.id, TransactionKind::Income, 20000, datetime!(2025-03-01 03:30 UTC));
        // 23:30 on 28 February in São Paulo.
        post(checking.id, TransactionKind::Income, 1, datetime!(2025-03-01 02:30 UTC));
        post(checking.id, TransactionKind::Expense, 3000, datetime!(2025-03-10 12:00 UTC));
        post(checking.id, TransactionKind::Expense, 7, datetime!(2025-02-10 12:00 UTC));
        let transfer = create_transaction(
            &NewTransaction::new(
                checking.id,
                TransactionKind::Transfer,
                Money::from_cents(10000),
                datetime!(2025-03-11 12:00 UTC),
                "",
            )
            .to_account(savings.id),
            owner,
            &conn,
        )
        .unwrap();

        let summary = dashboard_summary(owner, datetime!(2025-03-17 15:42 -3), &conn).unwrap();

        assert_eq!(
            summary.total_balance,
            Money::from_cents(100000 + 50000 + 20000 + 1 - 3000 - 7)
        );
        assert_eq!(summary.month_income, Money::from_cents(20000));
        assert_eq!(summary.month_expense, Money::from_cents(3000));
        // The opening balances are dated when the accounts were created, so they come first.
        let kinds: Vec<TransactionKind> = summary
            .recent_transactions
            .iter()
            .map(|transaction| transaction.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Initial,
                TransactionKind::Initial,
                TransactionKind::Transfer,
                TransactionKind::Expense,
                TransactionKind::Income,
            ]
        );
        assert_eq!(summary.recent_transactions[2], transfer);
    }

    #[test]
    fn empty_user_has_zero_summary() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);

        let summary = dashboard_summary(owner, datetime!(2025-03-17 15:42 -3), &conn).unwrap();

        assert_eq!(summary.total_balance, Money::ZERO);
        assert_eq!(summary.month_income, Money::ZERO);
        assert_eq!(summary.month_expense, Money::ZERO);
        assert!(summary.recent_transactions.is_empty());
    }
}
