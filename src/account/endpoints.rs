//! Route handlers for a user's own accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    account::{AccountId, AccountKind, AccountRepository, NewAccount},
    auth::Claims,
    db::lock_connection,
    money::Money,
    transaction::{create_account, list_transactions_by_account},
};

/// The state needed for the account routes.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn default_currency() -> String {
    "BRL".to_owned()
}

/// The request body for opening an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub kind: AccountKind,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub initial_balance: Money,
    #[serde(default)]
    pub color: Option<String>,
}

/// The request body for editing an account. Only the display fields can change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A route handler for opening an account.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    claims: Claims,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = create_account(
        &NewAccount {
            name: request.name.trim().to_owned(),
            kind: request.kind,
            currency: request.currency,
            initial_balance: request.initial_balance,
            color: request.color,
        },
        claims.user_id(),
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// A route handler for listing the current user's accounts.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
    claims: Claims,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let accounts = AccountRepository::new(&connection).list(claims.user_id())?;

    Ok(Json(accounts))
}

/// A route handler for getting one of the current user's accounts.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    claims: Claims,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = AccountRepository::new(&connection).find_by_id(account_id, claims.user_id())?;

    Ok(Json(account))
}

/// A route handler for renaming or recoloring an account.
pub async fn update_account_endpoint(
    State(state): State<AccountState>,
    claims: Claims,
    Path(account_id): Path<AccountId>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, Error> {
    let name = request.name.trim();

    if name.is_empty() {
        return Err(Error::InvalidRequest(
            "the account name cannot be empty".to_owned(),
        ));
    }

    let connection = lock_connection(&state.db_connection)?;
    let account = AccountRepository::new(&connection).update_details(
        account_id,
        claims.user_id(),
        name,
        request.color.as_deref(),
    )?;

    Ok(Json(account))
}

/// A route handler for deleting an account. Its transactions are kept.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    claims: Claims,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    AccountRepository::new(&connection).soft_delete(
        account_id,
        claims.user_id(),
        OffsetDateTime::now_utc(),
    )?;

    tracing::info!("user {} deleted account {account_id}", claims.user_id());

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for listing the transactions of one of the current user's accounts, newest
/// first.
pub async fn get_account_transactions_endpoint(
    State(state): State<AccountState>,
    claims: Claims,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    AccountRepository::new(&connection).find_by_id(account_id, claims.user_id())?;
    let transactions = list_transactions_by_account(account_id, &connection)?;

    Ok(Json(transactions))
}
