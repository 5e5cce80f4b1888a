//! Registration and log in.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Duration;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::{JwtKeys, encode_jwt},
    db::lock_connection,
    user::{create_user, get_user_by_email, parse_email},
};

/// The state needed to register users and issue tokens.
#[derive(Clone)]
pub struct AuthState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub jwt_keys: JwtKeys,
    pub token_duration: Duration,
    pub password_cost: u32,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
            password_cost: state.password_cost,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_keys.clone()
    }
}

/// The email and password sent to register or log in.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A route handler for registering a new user.
///
/// Responds with the new user's ID and email address.
pub async fn register_user(
    State(state): State<AuthState>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, Error> {
    let email = parse_email(&credentials.email)?;
    let password = ValidatedPassword::new(&credentials.password, &[email.as_str()])?;
    let password_hash = PasswordHash::new(&password, state.password_cost)?;

    let connection = lock_connection(&state.db_connection)?;
    let user = create_user(email, password_hash, &connection)?;

    tracing::info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": user.id, "email": user.email.to_string() })),
    ))
}

/// A route handler for exchanging an email and password for an access token.
///
/// An unknown email and a wrong password get the same response.
pub async fn log_in(
    State(state): State<AuthState>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, Error> {
    let email = parse_email(&credentials.email).map_err(|_| Error::InvalidCredentials)?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;

        get_user_by_email(&email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    if !user.password_hash.verify(&credentials.password)? {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_jwt(user.id, state.token_duration, &state.jwt_keys)?;

    Ok(Json(json!({ "token": token })))
}
