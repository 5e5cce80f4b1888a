//! Route handlers for previewing and importing bank statements.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Claims,
    db::lock_connection,
    import::{StatementUpload, extract_upload, import_transactions, prepare_import, read_upload},
    statement::Extractor,
    transaction::NewTransaction,
};

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler listing the statement layouts that can be imported.
pub async fn list_extractors_endpoint(_claims: Claims) -> impl IntoResponse {
    Json(Extractor::list())
}

/// A route handler that parses a statement and returns the rows an import would post.
pub async fn preview_import_endpoint(
    State(state): State<ImportState>,
    claims: Claims,
    multipart: Multipart,
) -> Result<impl IntoResponse, Error> {
    let (upload, rows) = extract(multipart).await?;

    let connection = lock_connection(&state.db_connection)?;
    let rows = prepare_import(upload.account_id, rows, claims.user_id(), &connection)?;

    Ok(Json(rows))
}

/// A route handler that parses a statement and posts every row to the chosen account.
///
/// Either every row is posted or none are.
pub async fn import_endpoint(
    State(state): State<ImportState>,
    claims: Claims,
    multipart: Multipart,
) -> Result<impl IntoResponse, Error> {
    let start_time = std::time::Instant::now();
    let (upload, rows) = extract(multipart).await?;

    let connection = lock_connection(&state.db_connection)?;
    let rows = prepare_import(upload.account_id, rows, claims.user_id(), &connection)?;
    let result = import_transactions(&rows, claims.user_id(), &connection)?;

    tracing::debug!(
        "imported {} statement into account {} in {:.1}ms",
        upload.extractor,
        upload.account_id,
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    Ok((StatusCode::CREATED, Json(result)))
}

async fn extract(multipart: Multipart) -> Result<(StatementUpload, Vec<NewTransaction>), Error> {
    let upload = read_upload(multipart).await?;

    tokio::task::spawn_blocking(move || extract_upload(&upload).map(|rows| (upload, rows)))
        .await
        .map_err(|error| {
            tracing::error!("statement extraction task failed: {error}");
            Error::Io("the statement could not be decoded".to_owned())
        })?
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{Value, json};

    use crate::{
        AppState,
        account::AccountRepository,
        category::create_category,
        endpoints,
        money::Money,
        rule::{RuleData, create_rule},
        test_utils::{
            TestUser, create_test_account, create_test_api_user, get_test_app_state,
            get_test_server,
        },
    };

    const NUBANK_TEXT: &str = "02 JUN 2025\n\
        Transferência recebida pelo Pix\n\
        Maria Silva - •••.123.456-••\n\
        100,00\n\
        03 JUN 2025\n\
        Transferência enviada pelo Pix\n\
        Uber do Brasil - 17.895.646/0001-87\n\
        30,50";

    fn statement_form(extractor: &str, account_id: i64, text: &str) -> MultipartForm {
        MultipartForm::new()
            .add_text("extractor", extractor.to_owned())
            .add_text("account_id", account_id.to_string())
            .add_part(
                "file",
                Part::text(text.to_owned())
                    .file_name("extrato.txt")
                    .mime_type("text/plain"),
            )
    }

    fn open_account(state: &AppState, user: &TestUser, cents: i64) -> i64 {
        let connection = state.db_connection.lock().unwrap();
        create_test_account(user.id, Money::from_cents(cents), &connection).id
    }

    fn balance(state: &AppState, account_id: i64) -> Money {
        let connection = state.db_connection.lock().unwrap();
        AccountRepository::new(&connection)
            .find_by_id_unscoped(account_id)
            .unwrap()
            .balance
    }

    #[tokio::test]
    async fn lists_extractors() {
        let state = get_test_app_state();
        let user = create_test_api_user(&state, "owner@example.com");
        let server = get_test_server(&state);

        let response = server
            .get(endpoints::EXTRACTORS)
            .authorization_bearer(&user.token)
            .await;

        response.assert_status_ok();
        let keys: Vec<Value> = response
            .json::<Vec<Value>>()
            .into_iter()
            .map(|listing| listing["key"].clone())
            .collect();
        assert_eq!(
            keys,
            vec![
                json!("caixa_extrato"),
                json!("caixa_cc_fatura"),
                json!("nubank_extrato"),
                json!("nubank_cc_fatura"),
            ]
        );
    }

    #[tokio::test]
    async fn preview_does_not_post() {
        let state = get_test_app_state();
        let user = create_test_api_user(&state, "owner@example.com");
        let account = open_account(&state, &user, 0);
        let server = get_test_server(&state);

        let response = server
            .post(endpoints::IMPORT_PREVIEW)
            .authorization_bearer(&user.token)
            .multipart(statement_form("nubank_extrato", account, NUBANK_TEXT))
            .await;

        response.assert_status_ok();
        let rows = response.json::<Vec<Value>>();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["kind"], "income");
        assert_eq!(rows[1]["amount"], "30.50");
        assert_eq!(balance(&state, account), Money::ZERO);
    }

    #[tokio::test]
    async fn import_posts_and_categorizes() {
        let state = get_test_app_state();
        let user = create_test_api_user(&state, "owner@example.com");
        let account = open_account(&state, &user, 0);
        let transport = {
            let connection = state.db_connection.lock().unwrap();
            let category = create_category("Transporte", user.id, &connection).unwrap();
            create_rule(
                &RuleData {
                    pattern: "UBER".to_owned(),
                    category_id: category.id,
                },
                user.id,
                &connection,
            )
            .unwrap();
            category.id
        };
        let server = get_test_server(&state);

        let response = server
            .post(endpoints::IMPORT)
            .authorization_bearer(&user.token)
            .multipart(statement_form("nubank_extrato", account, NUBANK_TEXT))
            .await;

        response.assert_status(StatusCode::CREATED);
        let result = response.json::<Value>();
        assert_eq!(result["transactions_imported"], 2);
        assert_eq!(result["transactions_categorized"], 1);
        assert_eq!(result["transactions"][1]["category_ids"], json!([transport]));
        assert_eq!(balance(&state, account), Money::from_cents(6950));
    }

    #[tokio::test]
    async fn overdrawn_import_rolls_back() {
        let state = get_test_app_state();
        let user = create_test_api_user(&state, "owner@example.com");
        let account = open_account(&state, &user, 1000);
        let server = get_test_server(&state);
        let text = "02 JUN 2025\n\
            Transferência enviada pelo Pix\n\
            Mercado - 1\n\
            5,00\n\
            Transferência enviada pelo Pix\n\
            Aluguel - 2\n\
            900,00";

        let response = server
            .post(endpoints::IMPORT)
            .authorization_bearer(&user.token)
            .multipart(statement_form("nubank_extrato", account, text))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(balance(&state, account), Money::from_cents(1000));
        let transactions = server
            .get(&endpoints::format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, account))
            .authorization_bearer(&user.token)
            .await
            .json::<Vec<Value>>();
        assert_eq!(transactions.len(), 1);
    }

    #[tokio::test]
    async fn rejects_bad_uploads() {
        let state = get_test_app_state();
        let owner = create_test_api_user(&state, "owner@example.com");
        let other = create_test_api_user(&state, "other@example.com");
        let account = open_account(&state, &owner, 0);
        let server = get_test_server(&state);

        server
            .post(endpoints::IMPORT)
            .authorization_bearer(&owner.token)
            .multipart(statement_form("itau_extrato", account, NUBANK_TEXT))
            .await
            .assert_status_bad_request();
        server
            .post(endpoints::IMPORT)
            .authorization_bearer(&owner.token)
            .multipart(MultipartForm::new().add_text("extractor", "nubank_extrato"))
            .await
            .assert_status_bad_request();
        server
            .post(endpoints::IMPORT)
            .authorization_bearer(&owner.token)
            .multipart(
                MultipartForm::new()
                    .add_text("extractor", "nubank_extrato")
                    .add_text("account_id", account.to_string())
                    .add_part(
                        "file",
                        Part::bytes(b"definitely not a pdf".to_vec())
                            .file_name("extrato.pdf")
                            .mime_type("application/pdf"),
                    ),
            )
            .await
            .assert_status_bad_request();
        server
            .post(endpoints::IMPORT)
            .authorization_bearer(&other.token)
            .multipart(statement_form("nubank_extrato", account, NUBANK_TEXT))
            .await
            .assert_status_not_found();
    }
}
