//! Read-only access to an account for users other than its owner.
//!
//! The owner invites an email address and receives a token. The invitation is accepted by the
//! user registered with that address, which creates the share. Shares grant read access to the
//! account and its transactions, never the right to post or delete.

use rusqlite::{Connection, Row, params};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    account::{Account, AccountId, AccountRepository, map_account_row},
    transaction::{Transaction, list_transactions_by_account},
    user::{UserId, get_user_by_id, parse_email},
};

/// A pending or accepted invitation to share an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareInvitation {
    pub token: String,
    pub account_id: AccountId,
    pub inviter_id: UserId,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub accepted_at: Option<OffsetDateTime>,
}

/// A user's read access to another user's account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountShare {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Invite `email` to view one of `owner`'s accounts.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `owner` has no live account with the ID `account_id`,
/// - [Error::InvalidEmail] if `email` is not a valid address,
/// - [Error::InvalidRequest] if `email` is the owner's own address,
/// - [Error::DuplicateShare] if the account is already shared with that address,
/// - [Error::SqlError] if there is some other SQL error.
pub fn invite(
    account_id: AccountId,
    email: &str,
    owner: UserId,
    connection: &Connection,
) -> Result<ShareInvitation, Error> {
    AccountRepository::new(connection).find_by_id(account_id, owner)?;

    let email = parse_email(email)?.to_string().to_lowercase();
    let inviter = get_user_by_id(owner, connection)?;

    if inviter.email.to_string().to_lowercase() == email {
        return Err(Error::InvalidRequest(
            "an account cannot be shared with its owner".to_owned(),
        ));
    }

    let already_shared = connection
        .prepare(
            "SELECT 1 FROM account_shares s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.account_id = ?1 AND LOWER(u.email) = ?2",
        )?
        .exists(params![account_id, email])?;

    if already_shared {
        return Err(Error::DuplicateShare);
    }

    let invitation = connection
        .prepare(
            "INSERT INTO share_invitations (token, account_id, inviter_id, email, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING token, account_id, inviter_id, email, created_at, accepted_at",
        )?
        .query_row(
            params![
                Uuid::new_v4().to_string(),
                account_id,
                owner.as_i64(),
                email,
                OffsetDateTime::now_utc()
            ],
            map_invitation_row,
        )?;

    tracing::info!("user {owner} invited a user to view account {account_id}");

    Ok(invitation)
}

/// Accept the invitation identified by `token` on behalf of `user`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the token is unknown, already used, or was issued to a different
///   email address than `user`'s,
/// - [Error::DuplicateShare] if `user` can already view the account,
/// - [Error::SqlError] if there is some other SQL error.
pub fn accept_invitation(
    token: &str,
    user: UserId,
    connection: &Connection,
) -> Result<AccountShare, Error> {
    let invitee = get_user_by_id(user, connection)?;
    let tx = connection.unchecked_transaction()?;

    let invitation = tx
        .prepare(
            "SELECT token, account_id, inviter_id, email, created_at, accepted_at
             FROM share_invitations WHERE token = ?1 AND accepted_at IS NULL",
        )?
        .query_row([token], map_invitation_row)?;

    if invitation.email != invitee.email.to_string().to_lowercase() {
        return Err(Error::NotFound);
    }

    AccountRepository::new(&tx).find_by_id(invitation.account_id, invitation.inviter_id)?;

    let now = OffsetDateTime::now_utc();
    tx.execute(
        "INSERT INTO account_shares (account_id, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![invitation.account_id, user.as_i64(), now],
    )
    .map_err(|error| match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateShare,
        error => error.into(),
    })?;
    tx.execute(
        "UPDATE share_invitations SET accepted_at = ?1 WHERE token = ?2",
        params![now, token],
    )?;
    let share = tx
        .prepare(
            "SELECT s.account_id, s.user_id, u.email, s.created_at FROM account_shares s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.account_id = ?1 AND s.user_id = ?2",
        )?
        .query_row(params![invitation.account_id, user.as_i64()], map_share_row)?;
    tx.commit()?;

    tracing::info!(
        "user {user} accepted an invitation to view account {}",
        invitation.account_id
    );

    Ok(share)
}

/// The users who can view one of `owner`'s accounts.
pub fn list_shares(
    account_id: AccountId,
    owner: UserId,
    connection: &Connection,
) -> Result<Vec<AccountShare>, Error> {
    AccountRepository::new(connection).find_by_id(account_id, owner)?;

    connection
        .prepare(
            "SELECT s.account_id, s.user_id, u.email, s.created_at FROM account_shares s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.account_id = ?1
             ORDER BY s.created_at ASC, s.user_id ASC",
        )?
        .query_map([account_id], map_share_row)?
        .map(|maybe_share| maybe_share.map_err(|error| error.into()))
        .collect()
}

/// Stop sharing one of `owner`'s accounts with `user`.
///
/// # Errors
/// Returns [Error::NotFound] if `owner` has no such account or it is not shared with `user`.
pub fn revoke_share(
    account_id: AccountId,
    user: UserId,
    owner: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    AccountRepository::new(connection).find_by_id(account_id, owner)?;

    let rows_affected = connection.execute(
        "DELETE FROM account_shares WHERE account_id = ?1 AND user_id = ?2",
        params![account_id, user.as_i64()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("user {owner} stopped sharing account {account_id} with user {user}");

    Ok(())
}

/// The live accounts other users have shared with `user`.
pub fn list_shared_accounts(user: UserId, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT a.id, a.user_id, a.name, a.kind, a.currency, a.initial_balance, a.balance,
                    a.color, a.created_at, a.deleted_at
             FROM accounts a
             INNER JOIN account_shares s ON s.account_id = a.id
             WHERE s.user_id = ?1 AND a.deleted_at IS NULL
             ORDER BY a.id ASC",
        )?
        .query_map([user.as_i64()], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Get an account shared with `user` and its transactions.
///
/// # Errors
/// Returns [Error::NotFound] if the account is deleted or not shared with `user`.
pub fn get_shared_account_transactions(
    account_id: AccountId,
    user: UserId,
    connection: &Connection,
) -> Result<(Account, Vec<Transaction>), Error> {
    let is_shared = connection
        .prepare("SELECT 1 FROM account_shares WHERE account_id = ?1 AND user_id = ?2")?
        .exists(params![account_id, user.as_i64()])?;

    if !is_shared {
        return Err(Error::NotFound);
    }

    let account = AccountRepository::new(connection).find_by_id_unscoped(account_id)?;
    let transactions = list_transactions_by_account(account_id, connection)?;

    Ok((account, transactions))
}

pub fn create_share_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS account_shares (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(account_id, user_id),
            FOREIGN KEY(account_id) REFERENCES accounts(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_account_shares_user_id ON account_shares(user_id);

        CREATE TABLE IF NOT EXISTS share_invitations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token TEXT NOT NULL UNIQUE,
            account_id INTEGER NOT NULL,
            inviter_id INTEGER NOT NULL,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            accepted_at TEXT,
            FOREIGN KEY(account_id) REFERENCES accounts(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(inviter_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

fn map_invitation_row(row: &Row) -> Result<ShareInvitation, rusqlite::Error> {
    Ok(ShareInvitation {
        token: row.get(0)?,
        account_id: row.get(1)?,
        inviter_id: UserId::new(row.get(2)?),
        email: row.get(3)?,
        created_at: row.get(4)?,
        accepted_at: row.get(5)?,
    })
}

fn map_share_row(row: &Row) -> Result<AccountShare, rusqlite::Error> {
    Ok(AccountShare {
        account_id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}
