//! Reading statement uploads and posting their transactions.

use axum::extract::{Multipart, multipart::Field};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    account::{AccountId, AccountRepository},
    rule::{categorize_new_transactions, list_rules},
    statement::Extractor,
    transaction::{NewTransaction, Transaction, create_transaction_in_scope},
    user::UserId,
};

/// The contents of a statement upload form.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementUpload {
    /// The layout of the statement.
    pub extractor: Extractor,
    /// The account the statement belongs to.
    pub account_id: AccountId,
    /// The uploaded file.
    pub file: StatementFile,
}

/// An uploaded statement, either the PDF itself or text already extracted from one.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementFile {
    Pdf(Vec<u8>),
    Text(String),
}

/// The outcome of an import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportResult {
    /// Number of transactions posted.
    pub transactions_imported: usize,
    /// Number of posted transactions that received a category from a rule.
    pub transactions_categorized: usize,
    /// The posted transactions in statement order.
    pub transactions: Vec<Transaction>,
}

/// Read the `extractor`, `account_id` and `file` fields of a statement upload.
///
/// A file sent with a `text/*` content type is taken to be text already extracted from a
/// statement, anything else is treated as a PDF.
///
/// # Errors
/// Returns [Error::InvalidRequest] for a malformed form or a missing field, and
/// [Error::UnknownExtractor] if the extractor key is not registered.
pub async fn read_upload(mut multipart: Multipart) -> Result<StatementUpload, Error> {
    let mut extractor = None;
    let mut account_id = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::debug!("could not read multipart field: {error}");
        Error::InvalidRequest(format!("could not read the upload: {error}"))
    })? {
        let name = field.name().unwrap_or_default().to_owned();

        match name.as_str() {
            "extractor" => {
                extractor = Some(read_text(field).await?.trim().parse::<Extractor>()?);
            }
            "account_id" => {
                let raw = read_text(field).await?;
                let id = raw.trim().parse::<AccountId>().map_err(|_| {
                    Error::InvalidRequest(format!("\"{raw}\" is not a valid account ID"))
                })?;
                account_id = Some(id);
            }
            "file" => file = Some(read_file(field).await?),
            other => tracing::debug!("ignoring multipart field \"{other}\""),
        }
    }

    Ok(StatementUpload {
        extractor: extractor.ok_or_else(|| missing_field("extractor"))?,
        account_id: account_id.ok_or_else(|| missing_field("account_id"))?,
        file: file.ok_or_else(|| missing_field("file"))?,
    })
}

fn missing_field(name: &str) -> Error {
    Error::InvalidRequest(format!("the upload is missing the \"{name}\" field"))
}

async fn read_text(field: Field<'_>) -> Result<String, Error> {
    field.text().await.map_err(|error| {
        tracing::debug!("could not read multipart text field: {error}");
        Error::InvalidRequest(format!("could not read the upload: {error}"))
    })
}

async fn read_file(field: Field<'_>) -> Result<StatementFile, Error> {
    let is_text = field
        .content_type()
        .is_some_and(|content_type| content_type.starts_with("text/"));
    let file_name = field.file_name().unwrap_or("<unnamed>").to_owned();
    let bytes = field.bytes().await.map_err(|error| {
        tracing::debug!("could not read multipart file field: {error}");
        Error::InvalidRequest(format!("could not read the upload: {error}"))
    })?;

    tracing::debug!("received statement '{file_name}' that is {} bytes", bytes.len());

    if is_text {
        String::from_utf8(bytes.to_vec())
            .map(StatementFile::Text)
            .map_err(|_| Error::Io(format!("{file_name} is not valid UTF-8 text")))
    } else {
        Ok(StatementFile::Pdf(bytes.to_vec()))
    }
}

/// Turn an upload into transactions for its account.
///
/// PDF decoding is CPU bound, call this from a blocking task.
///
/// # Errors
/// Returns an error if the PDF cannot be decoded or the text lacks a marker the layout needs.
pub fn extract_upload(upload: &StatementUpload) -> Result<Vec<NewTransaction>, Error> {
    let text = match &upload.file {
        StatementFile::Pdf(bytes) => upload.extractor.extract_text_from_bytes(bytes)?,
        StatementFile::Text(text) => text.clone(),
    };

    Ok(upload
        .extractor
        .extract_transactions(&text, upload.account_id)?)
}

/// Check the target account and file the extracted rows under `owner`'s categories.
///
/// Nothing is written.
///
/// # Errors
/// Returns [Error::NotFound] if the account is not one of `owner`'s live accounts.
pub fn prepare_import(
    account_id: AccountId,
    mut rows: Vec<NewTransaction>,
    owner: UserId,
    connection: &Connection,
) -> Result<Vec<NewTransaction>, Error> {
    AccountRepository::new(connection).find_by_id(account_id, owner)?;

    let rules = list_rules(owner, connection)?;
    categorize_new_transactions(&mut rows, &rules);

    Ok(rows)
}

/// Post every row for `owner` in a single scope.
///
/// If any row fails, e.g. with [Error::InsufficientFunds], none of the rows are kept.
///
/// # Errors
/// Returns the error of the first row that failed.
pub fn import_transactions(
    rows: &[NewTransaction],
    owner: UserId,
    connection: &Connection,
) -> Result<ImportResult, Error> {
    let tx = AccountRepository::new(connection).begin()?;
    let mut transactions = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let transaction = create_transaction_in_scope(row, owner, &tx).inspect_err(|error| {
            tracing::info!("import aborted at row {index} of {}: {error}", rows.len());
        })?;
        transactions.push(transaction);
    }

    tx.commit()?;

    let transactions_categorized = transactions
        .iter()
        .filter(|transaction| !transaction.category_ids.is_empty())
        .count();

    tracing::info!(
        "user {owner} imported {} transactions, {transactions_categorized} categorized",
        transactions.len()
    );

    Ok(ImportResult {
        transactions_imported: transactions.len(),
        transactions_categorized,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        Error,
        account::AccountRepository,
        category::create_category,
        money::Money,
        rule::{RuleData, create_rule},
        statement::Extractor,
        test_utils::{create_test_account, create_test_user, get_test_connection},
        transaction::{NewTransaction, TransactionKind, list_transactions_by_account},
    };

    use super::{
        StatementFile, StatementUpload, extract_upload, import_transactions, prepare_import,
    };

    const NUBANK_TEXT: &str = "02 JUN 2025\n\
        Transferência recebida pelo Pix\n\
        Maria Silva - •••.123.456-••\n\
        100,00\n\
        Transferência enviada pelo Pix\n\
        Uber do Brasil - 17.895.646/0001-87\n\
        30,50";

    fn row(
        account_id: i64,
        kind: TransactionKind,
        cents: i64,
        description: &str,
    ) -> NewTransaction {
        NewTransaction::new(
            account_id,
            kind,
            Money::from_cents(cents),
            datetime!(2025-06-02 00:00 UTC),
            description,
        )
    }

    #[test]
    fn extracts_text_upload() {
        let upload = StatementUpload {
            extractor: Extractor::NubankExtrato,
            account_id: 7,
            file: StatementFile::Text(NUBANK_TEXT.to_owned()),
        };

        let rows = extract_upload(&upload).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.account_id == 7));
        assert_eq!(rows[0].kind, TransactionKind::Income);
        assert_eq!(rows[1].kind, TransactionKind::Expense);
        assert_eq!(rows[1].amount, Money::from_cents(3050));
    }

    #[test]
    fn pdf_upload_that_is_not_a_pdf_fails() {
        let upload = StatementUpload {
            extractor: Extractor::NubankExtrato,
            account_id: 7,
            file: StatementFile::Pdf(b"definitely not a pdf".to_vec()),
        };

        assert!(matches!(extract_upload(&upload), Err(Error::Io(_))));
    }

    #[test]
    fn prepare_applies_rules_and_checks_owner() {
        let connection = get_test_connection();
        let owner = create_test_user("owner@example.com", &connection);
        let other = create_test_user("other@example.com", &connection);
        let account = create_test_account(owner, Money::ZERO, &connection);
        let transport = create_category("Transporte", owner, &connection).unwrap();
        create_rule(
            &RuleData {
                pattern: "uber".to_owned(),
                category_id: transport.id,
            },
            owner,
            &connection,
        )
        .unwrap();
        let rows = vec![
            row(account.id, TransactionKind::Income, 10000, "Pix Maria"),
            row(account.id, TransactionKind::Expense, 3050, "Pix Uber do Brasil"),
        ];

        let prepared = prepare_import(account.id, rows.clone(), owner, &connection).unwrap();

        assert!(prepared[0].category_ids.is_empty());
        assert_eq!(prepared[1].category_ids, vec![transport.id]);
        assert_eq!(
            prepare_import(account.id, rows, other, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn imports_all_rows() {
        let connection = get_test_connection();
        let owner = create_test_user("owner@example.com", &connection);
        let account = create_test_account(owner, Money::ZERO, &connection);
        let rows = vec![
            row(account.id, TransactionKind::Income, 10000, "Pix Maria"),
            row(account.id, TransactionKind::Expense, 3050, "Uber"),
        ];

        let result = import_transactions(&rows, owner, &connection).unwrap();

        assert_eq!(result.transactions_imported, 2);
        assert_eq!(result.transactions_categorized, 0);
        let balance = AccountRepository::new(&connection)
            .find_by_id(account.id, owner)
            .unwrap()
            .balance;
        assert_eq!(balance, Money::from_cents(6950));
    }

    #[test]
    fn failing_row_rolls_back_every_row() {
        let connection = get_test_connection();
        let owner = create_test_user("owner@example.com", &connection);
        let account = create_test_account(owner, Money::from_cents(1000), &connection);
        let rows = vec![
            row(account.id, TransactionKind::Income, 5000, "Salário"),
            row(account.id, TransactionKind::Expense, 2000, "Mercado"),
            row(account.id, TransactionKind::Expense, 9000, "Aluguel"),
        ];

        let result = import_transactions(&rows, owner, &connection);

        assert_eq!(result, Err(Error::InsufficientFunds));
        let accounts = AccountRepository::new(&connection);
        assert_eq!(
            accounts.find_by_id(account.id, owner).unwrap().balance,
            Money::from_cents(1000)
        );
        let kinds: Vec<_> = list_transactions_by_account(account.id, &connection)
            .unwrap()
            .into_iter()
            .map(|transaction| transaction.kind)
            .collect();
        assert_eq!(kinds, vec![TransactionKind::Initial]);
    }
}
