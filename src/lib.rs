//! Contas is a personal finance service for tracking money across bank accounts.
//!
//! This library provides a JSON API for:
//! - accounts whose balances are kept consistent with their transactions,
//! - income, expenses and transfers, each posted atomically with its balance updates,
//! - categories and rules that categorize transactions by their description,
//! - importing Caixa and Nubank statement PDFs,
//! - sharing read access to an account with other users.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod category;
mod config;
mod db;
mod endpoints;
mod error;
mod import;
mod logging;
mod money;
mod password;
mod routing;
mod rule;
mod share;
mod statement;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use config::{
    DEFAULT_LOCAL_TIMEZONE, DEFAULT_TOKEN_DURATION, DurationParseError, jwt_secret_or_random,
    parse_duration,
};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use money::Money;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use statement::{ExtractError, Extractor};
pub use transaction::{NewTransaction, TransactionKind};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
