//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::Duration;

use crate::{
    Error, PasswordHash, auth::JwtKeys, config::signing_key, db::initialize,
    timezone::get_local_offset,
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The keys for signing and verifying access tokens.
    pub jwt_keys: JwtKeys,

    /// How long an access token stays valid.
    pub token_duration: Duration,

    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,

    /// The bcrypt cost for new password hashes.
    pub password_cost: u32,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an [Error::InvalidTimezone] if `local_timezone` is not a canonical timezone name,
    /// or an [Error::SqlError] if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        jwt_secret: &str,
        token_duration: Duration,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        get_local_offset(local_timezone)?;
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            jwt_keys: JwtKeys::new(&signing_key(jwt_secret)),
            token_duration,
            local_timezone: local_timezone.to_owned(),
            password_cost: PasswordHash::DEFAULT_COST,
        })
    }

    /// Use `cost` rounds for new password hashes.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }
}
