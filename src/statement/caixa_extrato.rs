//! Caixa current-account statements.
//!
//! Each posting is printed as five consecutive tokens:
//!
//! ```text
//! 01/08/2024    000123    TEDSALARIO    5.112,83 C    5.112,83 C
//! date          doc no.   description   amount        running balance
//! ```
//!
//! Anything else (page headers, daily balance lines) is skipped one token at a time.

use crate::{
    account::AccountId,
    money::Money,
    statement::{
        parse::{parse_amount, parse_date, statement_timestamp},
        tokenize::{Separators, tokenize},
    },
    transaction::{NewTransaction, TransactionKind},
};

const ROW_WIDTH: usize = 5;

const HEADER_TOKENS: [&str; 3] = ["Data Mov.", "SALDO DIA", "SALDO ANTERIOR"];

pub(super) fn extract_transactions(text: &str, account_id: AccountId) -> Vec<NewTransaction> {
    let tokens = tokenize(text, Separators::LinesAndTabs);
    let mut transactions = Vec::new();
    let mut cursor = 0;

    while cursor + ROW_WIDTH <= tokens.len() {
        let window = &tokens[cursor..cursor + ROW_WIDTH];

        if !is_transaction_row(window) {
            cursor += 1;
            continue;
        }

        cursor += ROW_WIDTH;

        match parse_row(window, account_id) {
            Some(transaction) => transactions.push(transaction),
            None => tracing::debug!("skipping Caixa statement row {window:?}"),
        }
    }

    transactions
}

fn is_transaction_row(window: &[&str]) -> bool {
    !HEADER_TOKENS.contains(&window[0])
        && parse_date(window[0]).is_some()
        && ends_with_direction(window[3])
        && ends_with_direction(window[4])
}

fn ends_with_direction(token: &str) -> bool {
    token.ends_with('C') || token.ends_with('D')
}

fn parse_row(window: &[&str], account_id: AccountId) -> Option<NewTransaction> {
    let date = parse_date(window[0])?;
    let (amount, direction) = split_direction(window[3]);
    let amount = parse_amount(amount)?;

    if amount == Money::ZERO {
        return None;
    }

    let kind = if direction.eq_ignore_ascii_case("C") {
        TransactionKind::Income
    } else {
        TransactionKind::Expense
    };

    Some(NewTransaction::new(
        account_id,
        kind,
        amount,
        statement_timestamp(date),
        window[2],
    ))
}

/// Split `"5.112,83 C"` into `("5.112,83", "C")`.
///
/// The caller guarantees the token ends with an ASCII direction letter, so a token without
/// whitespace is split before its last byte.
fn split_direction(token: &str) -> (&str, &str) {
    match token.rsplit_once(char::is_whitespace) {
        Some((amount, direction)) => (amount.trim_end(), direction),
        None => token.split_at(token.len() - 1),
    }
}
