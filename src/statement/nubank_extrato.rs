//! Nubank current-account statements.
//!
//! Postings are grouped under day headers such as `02 JUN 2025`. Each posting opens with a line
//! naming the movement (`Transferência enviada pelo Pix`), is followed by one or more detail lines
//! about the counterparty and closes with the amount:
//!
//! ```text
//! 02 JUN 2025
//! Transferência enviada pelo Pix
//! John Doe Company Ltda - 12.345.678/0001-90
//! BANCO EXEMPLO (0123) Agência: 1 Conta: 12345-6
//! 256,40
//! ```

use time::Date;

use crate::{
    account::AccountId,
    statement::{
        parse::{collapse_whitespace, parse_amount, parse_day_month_year, statement_timestamp},
        tokenize::{Separators, tokenize},
    },
    transaction::{NewTransaction, TransactionKind},
};

const OPENERS: [&str; 3] = ["Transferência", "Pagamento de fatura", "Reembolso"];

const INVOICE_PAYMENT: &str = "Pagamento de fatura";

const DETAIL_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'t> {
    /// Before the first day header.
    SearchingForDate,
    /// Inside a day, looking for the next posting.
    InDay { date: Date },
    /// Inside a posting, waiting for its amount.
    InBlock {
        date: Date,
        opener: &'t str,
        first_detail: Option<&'t str>,
    },
}

pub(super) fn extract_transactions(text: &str, account_id: AccountId) -> Vec<NewTransaction> {
    let mut transactions = Vec::new();
    let mut state = State::SearchingForDate;

    for line in tokenize(text, Separators::LinesAndTabs) {
        // A new day header always wins, even if it cuts a posting short.
        if let Some(date) = parse_day_month_year(line) {
            if let State::InBlock { opener, .. } = state {
                tracing::debug!("abandoning Nubank posting \"{opener}\" without an amount");
            }

            state = State::InDay { date };
            continue;
        }

        state = match state {
            State::SearchingForDate => State::SearchingForDate,
            State::InDay { date } if is_opener(line) => State::InBlock {
                date,
                opener: line,
                first_detail: None,
            },
            State::InDay { date } => State::InDay { date },
            State::InBlock { date, opener, .. } if is_opener(line) => {
                tracing::debug!("abandoning Nubank posting \"{opener}\" without an amount");
                State::InBlock {
                    date,
                    opener: line,
                    first_detail: None,
                }
            }
            State::InBlock {
                date,
                opener,
                first_detail,
            } if is_transaction_amount(line) => {
                match parse_amount(line).filter(|amount| amount.is_positive()) {
                    Some(amount) => transactions.push(NewTransaction::new(
                        account_id,
                        kind_of(opener),
                        amount,
                        statement_timestamp(date),
                        describe(opener, first_detail),
                    )),
                    None => tracing::debug!("skipping Nubank posting with amount \"{line}\""),
                }

                State::InDay { date }
            }
            State::InBlock {
                date,
                opener,
                first_detail,
            } => State::InBlock {
                date,
                opener,
                first_detail: first_detail.or(Some(line)),
            },
        };
    }

    transactions
}

fn is_opener(line: &str) -> bool {
    OPENERS.iter().any(|opener| line.starts_with(opener))
}

/// Whether `line` is the amount that closes a posting, e.g. `256,40` or `R$ 1.234,56`.
fn is_transaction_amount(line: &str) -> bool {
    let amount = line.strip_prefix("R$ ").unwrap_or(line);

    if amount.chars().any(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    let normalized = amount.replace('.', "").replace(',', ".");

    if normalized.parse::<f64>().is_err() {
        return false;
    }

    match normalized.split_once('.') {
        Some((_, fraction)) => !fraction.contains('.') && fraction.len() == 2,
        None => false,
    }
}

fn kind_of(opener: &str) -> TransactionKind {
    if opener.contains("recebida") || opener.contains("Reembolso") {
        TransactionKind::Income
    } else {
        TransactionKind::Expense
    }
}

fn describe(opener: &str, first_detail: Option<&str>) -> String {
    let description = match first_detail {
        Some(detail) => match detail.split_once(DETAIL_SEPARATOR) {
            Some((counterparty, _)) => format!("{opener} {counterparty}"),
            None if opener == INVOICE_PAYMENT => opener.to_owned(),
            None => format!("{opener} {detail}"),
        },
        None => opener.to_owned(),
    };

    collapse_whitespace(&description)
}
