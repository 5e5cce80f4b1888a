//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::{
    AppState, Error,
    account::{
        create_account_endpoint, delete_account_endpoint, get_account_endpoint,
        get_account_transactions_endpoint, list_accounts_endpoint, update_account_endpoint,
    },
    auth::{log_in, register_user},
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        list_categories_endpoint, update_category_endpoint,
    },
    endpoints,
    import::{import_endpoint, list_extractors_endpoint, preview_import_endpoint},
    logging::{MAX_BODY_BYTES, logging_middleware},
    rule::{
        apply_rules_endpoint, create_rule_endpoint, delete_rule_endpoint, get_rule_endpoint,
        list_rules_endpoint, update_rule_endpoint,
    },
    share::{
        accept_invitation_endpoint, get_shared_account_transactions_endpoint, invite_endpoint,
        list_shared_accounts_endpoint, list_shares_endpoint, revoke_share_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_dashboard_endpoint,
        get_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Every route except registration, log in and coffee needs a bearer token, which the handlers
/// check through the `Claims` extractor.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(log_in));

    let account_routes = Router::new()
        .route(
            endpoints::ACCOUNTS,
            post(create_account_endpoint).get(list_accounts_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint)
                .put(update_account_endpoint)
                .delete(delete_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT_TRANSACTIONS,
            get(get_account_transactions_endpoint),
        );

    let transaction_routes = Router::new()
        .route(endpoints::TRANSACTIONS, post(create_transaction_endpoint))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint));

    let category_routes = Router::new()
        .route(
            endpoints::CATEGORIES,
            post(create_category_endpoint).get(list_categories_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(
            endpoints::RULES,
            post(create_rule_endpoint).get(list_rules_endpoint),
        )
        .route(endpoints::APPLY_RULES, post(apply_rules_endpoint))
        .route(
            endpoints::RULE,
            get(get_rule_endpoint)
                .put(update_rule_endpoint)
                .delete(delete_rule_endpoint),
        );

    let share_routes = Router::new()
        .route(endpoints::ACCOUNT_INVITATIONS, post(invite_endpoint))
        .route(endpoints::ACCOUNT_SHARES, get(list_shares_endpoint))
        .route(endpoints::ACCOUNT_SHARE, delete(revoke_share_endpoint))
        .route(
            endpoints::ACCEPT_INVITATION,
            post(accept_invitation_endpoint),
        )
        .route(endpoints::SHARED_ACCOUNTS, get(list_shared_accounts_endpoint))
        .route(
            endpoints::SHARED_ACCOUNT_TRANSACTIONS,
            get(get_shared_account_transactions_endpoint),
        );

    let import_routes = Router::new()
        .route(endpoints::EXTRACTORS, get(list_extractors_endpoint))
        .route(endpoints::IMPORT_PREVIEW, post(preview_import_endpoint))
        .route(endpoints::IMPORT, post(import_endpoint));

    unprotected_routes
        .merge(account_routes)
        .merge(transaction_routes)
        .merge(category_routes)
        .merge(share_routes)
        .merge(import_routes)
        .fallback(get_404_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, "I'm a teapot").into_response()
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
