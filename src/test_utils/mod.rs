#![allow(missing_docs)]

use axum_test::TestServer;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, PasswordHash,
    account::{Account, AccountKind, NewAccount},
    auth::encode_jwt,
    build_router,
    db::initialize,
    money::Money,
    transaction::create_account,
    user::{UserId, create_user, parse_email},
};

/// An in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// App state over an in-memory database with a fixed secret and a fast bcrypt cost.
pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "foobar", Duration::hours(1), "America/Sao_Paulo")
        .expect("Could not create app state")
        .with_password_cost(4)
}

/// Insert a user with a throwaway password hash.
pub(crate) fn create_test_user(email: &str, connection: &Connection) -> UserId {
    let email = parse_email(email).expect("Invalid test email");

    create_user(email, PasswordHash::new_unchecked("hunter2"), connection)
        .expect("Could not create test user")
        .id
}

/// Open a checking account through the same path the API uses.
pub(crate) fn create_test_account(
    owner: UserId,
    initial_balance: Money,
    connection: &Connection,
) -> Account {
    create_account(
        &NewAccount {
            name: "Test Account".to_owned(),
            kind: AccountKind::Checking,
            currency: "BRL".to_owned(),
            initial_balance,
            color: None,
        },
        owner,
        connection,
    )
    .expect("Could not create test account")
}

/// A user of the full API.
pub(crate) struct TestUser {
    pub id: UserId,
    pub token: String,
}

/// Register `email` directly in the database and issue a token for them.
pub(crate) fn create_test_api_user(state: &AppState, email: &str) -> TestUser {
    let connection = state.db_connection.lock().expect("Could not lock database");
    let id = create_test_user(email, &connection);
    let token = encode_jwt(id, state.token_duration, &state.jwt_keys)
        .expect("Could not create test token");

    TestUser { id, token }
}

/// A test server for the full router.
pub(crate) fn get_test_server(state: &AppState) -> TestServer {
    TestServer::try_new(build_router(state.clone())).expect("Could not create test server.")
}
