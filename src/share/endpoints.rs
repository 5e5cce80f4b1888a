//! Route handlers for inviting users to view an account and for reading shared accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error,
    account::AccountId,
    auth::Claims,
    db::lock_connection,
    share::{
        accept_invitation, get_shared_account_transactions, invite, list_shared_accounts,
        list_shares, revoke_share,
    },
    user::UserId,
};

/// The state needed for the sharing routes.
#[derive(Debug, Clone)]
pub struct ShareState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ShareState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for inviting a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRequest {
    pub email: String,
}

/// A route handler for inviting an email address to view an account.
pub async fn invite_endpoint(
    State(state): State<ShareState>,
    claims: Claims,
    Path(account_id): Path<AccountId>,
    Json(request): Json<InvitationRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let invitation = invite(account_id, &request.email, claims.user_id(), &connection)?;

    Ok((StatusCode::CREATED, Json(invitation)))
}

/// A route handler for accepting an invitation as the current user.
pub async fn accept_invitation_endpoint(
    State(state): State<ShareState>,
    claims: Claims,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let share = accept_invitation(&token, claims.user_id(), &connection)?;

    Ok(Json(share))
}

/// A route handler for listing who can view one of the current user's accounts.
pub async fn list_shares_endpoint(
    State(state): State<ShareState>,
    claims: Claims,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let shares = list_shares(account_id, claims.user_id(), &connection)?;

    Ok(Json(shares))
}

/// A route handler for stopping sharing an account with a user.
pub async fn revoke_share_endpoint(
    State(state): State<ShareState>,
    claims: Claims,
    Path((account_id, user_id)): Path<(AccountId, i64)>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    revoke_share(
        account_id,
        UserId::new(user_id),
        claims.user_id(),
        &connection,
    )?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for listing the accounts shared with the current user.
pub async fn list_shared_accounts_endpoint(
    State(state): State<ShareState>,
    claims: Claims,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let accounts = list_shared_accounts(claims.user_id(), &connection)?;

    Ok(Json(accounts))
}

/// A route handler for reading an account shared with the current user and its transactions.
pub async fn get_shared_account_transactions_endpoint(
    State(state): State<ShareState>,
    claims: Claims,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let (account, transactions) =
        get_shared_account_transactions(account_id, claims.user_id(), &connection)?;

    Ok(Json(json!({
        "account": account,
        "transactions": transactions,
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        money::Money,
        test_utils::{
            TestUser, create_test_account, create_test_api_user, get_test_app_state,
            get_test_server,
        },
    };

    fn invitation_path(account_id: i64) -> String {
        format_endpoint(endpoints::ACCOUNT_INVITATIONS, account_id)
    }

    async fn share_account(
        server: &axum_test::TestServer,
        owner: &TestUser,
        viewer: &TestUser,
        viewer_email: &str,
        account_id: i64,
    ) {
        let response = server
            .post(&invitation_path(account_id))
            .authorization_bearer(&owner.token)
            .json(&json!({"email": viewer_email}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let token = response.json::<Value>()["token"]
            .as_str()
            .expect("token should be a string")
            .to_owned();

        server
            .post(&format_endpoint(endpoints::ACCEPT_INVITATION, token))
            .authorization_bearer(&viewer.token)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn invite_accept_read_and_revoke() {
        let state = get_test_app_state();
        let owner = create_test_api_user(&state, "owner@example.com");
        let viewer = create_test_api_user(&state, "viewer@example.com");
        let account = {
            let connection = state.db_connection.lock().unwrap();
            create_test_account(owner.id, Money::from_cents(2500), &connection)
        };
        let server = get_test_server(&state);

        share_account(&server, &owner, &viewer, "Viewer@Example.com", account.id).await;

        let shares = server
            .get(&format_endpoint(endpoints::ACCOUNT_SHARES, account.id))
            .authorization_bearer(&owner.token)
            .await
            .json::<Value>();
        assert_eq!(shares[0]["email"], "viewer@example.com");

        let shared = server
            .get(endpoints::SHARED_ACCOUNTS)
            .authorization_bearer(&viewer.token)
            .await
            .json::<Value>();
        assert_eq!(shared[0]["id"], account.id);

        let path = format_endpoint(endpoints::SHARED_ACCOUNT_TRANSACTIONS, account.id);
        let response = server.get(&path).authorization_bearer(&viewer.token).await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["account"]["balance"], "25.00");
        assert_eq!(body["transactions"].as_array().map(Vec::len), Some(1));

        let share_path = format_endpoint(
            &format_endpoint(endpoints::ACCOUNT_SHARE, account.id),
            viewer.id,
        );
        server
            .delete(&share_path)
            .authorization_bearer(&owner.token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&path)
            .authorization_bearer(&viewer.token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn viewer_cannot_use_owner_routes() {
        let state = get_test_app_state();
        let owner = create_test_api_user(&state, "owner@example.com");
        let viewer = create_test_api_user(&state, "viewer@example.com");
        let account = {
            let connection = state.db_connection.lock().unwrap();
            create_test_account(owner.id, Money::from_cents(2500), &connection)
        };
        let server = get_test_server(&state);
        share_account(&server, &owner, &viewer, "viewer@example.com", account.id).await;

        server
            .get(&format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, account.id))
            .authorization_bearer(&viewer.token)
            .await
            .assert_status_not_found();
        server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&viewer.token)
            .json(&json!({
                "account_id": account.id,
                "kind": "income",
                "amount": "1.00",
                "date": "2025-03-01T12:00:00Z"
            }))
            .await
            .assert_status_not_found();
        server
            .post(&invitation_path(account.id))
            .authorization_bearer(&viewer.token)
            .json(&json!({"email": "third@example.com"}))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn invitation_is_single_use_and_bound_to_email() {
        let state = get_test_app_state();
        let owner = create_test_api_user(&state, "owner@example.com");
        let viewer = create_test_api_user(&state, "viewer@example.com");
        let stranger = create_test_api_user(&state, "stranger@example.com");
        let account = {
            let connection = state.db_connection.lock().unwrap();
            create_test_account(owner.id, Money::ZERO, &connection)
        };
        let server = get_test_server(&state);

        let token = server
            .post(&invitation_path(account.id))
            .authorization_bearer(&owner.token)
            .json(&json!({"email": "viewer@example.com"}))
            .await
            .json::<Value>()["token"]
            .as_str()
            .expect("token should be a string")
            .to_owned();
        let accept_path = format_endpoint(endpoints::ACCEPT_INVITATION, &token);

        server
            .post(&accept_path)
            .authorization_bearer(&stranger.token)
            .await
            .assert_status_not_found();
        server
            .post(&accept_path)
            .authorization_bearer(&viewer.token)
            .await
            .assert_status_ok();
        server
            .post(&accept_path)
            .authorization_bearer(&viewer.token)
            .await
            .assert_status_not_found();
        server
            .post(&invitation_path(account.id))
            .authorization_bearer(&owner.token)
            .json(&json!({"email": "viewer@example.com"}))
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}
