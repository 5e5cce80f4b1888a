//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request violates a precondition, e.g. a non-positive amount or a transfer to the
    /// source account.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested resource was not found.
    ///
    /// Resources owned by another user are reported as not found too.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An expense or transfer would leave the source account with a negative balance.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// A statement was missing a section marker its layout requires.
    #[error("could not find the required marker \"{0}\" in the statement")]
    MissingMarker(String),

    /// A credit card invoice did not contain the year of its postings.
    #[error("could not find the invoice year in the statement")]
    MissingYear,

    /// A statement file could not be read or decoded.
    #[error("could not read the statement: {0}")]
    Io(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The email and password combination did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The bearer token was missing, malformed or expired.
    #[error("invalid token")]
    InvalidToken,

    /// A token could not be signed.
    #[error("could not create a token")]
    TokenCreation,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The string is not a valid email address.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The email address is already registered.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// The user already has a category with this name.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The account is already shared with this user.
    #[error("the account is already shared with this user")]
    DuplicateShare,

    /// No statement extractor is registered under this key.
    #[error("unknown extractor \"{0}\"")]
    UnknownExtractor(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The configured timezone is not a canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code used when the error is sent to a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_)
            | Error::MissingMarker(_)
            | Error::MissingYear
            | Error::Io(_)
            | Error::TooWeak(_)
            | Error::InvalidEmail(_)
            | Error::UnknownExtractor(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateEmail | Error::DuplicateCategoryName(_) | Error::DuplicateShare => {
                StatusCode::CONFLICT
            }
            Error::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
            Error::SqlError(_)
            | Error::TokenCreation
            | Error::HashingError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezone(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal errors are not intended to be shown to the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status_code, Json(json!({ "error": message }))).into_response()
    }
}
