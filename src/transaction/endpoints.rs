//! Route handlers for posting, reading and deleting transactions, and for the dashboard.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Claims,
    db::lock_connection,
    timezone::local_now,
    transaction::{
        NewTransaction, TransactionId, create_transaction, dashboard_summary, delete_transaction,
        get_transaction,
    },
};

/// The state needed for the transaction routes.
#[derive(Debug, Clone)]
pub struct TransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for posting a transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(&new_transaction, claims.user_id(), &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler for getting a transaction by its database ID.
///
/// Transactions on other users' accounts are reported as not found.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = get_transaction(transaction_id, claims.user_id(), &connection)?;

    Ok(Json(transaction))
}

/// A route handler for deleting a transaction and reversing its effect on balances.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_transaction(transaction_id, claims.user_id(), &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for the current user's summary.
pub async fn get_dashboard_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
) -> Result<impl IntoResponse, Error> {
    let now = local_now(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;
    let summary = dashboard_summary(claims.user_id(), now, &connection)?;

    Ok(Json(summary))
}
