//! Caixa credit card invoices.
//!
//! Postings are printed as a run of tokens:
//!
//! ```text
//! 15/05    16/05    MERCADO CENTRAL    1.234,56    02/10
//! bought   posted   description        amount      installment (optional)
//! ```
//!
//! Rows only carry day and month, the year comes from the invoice header (`10 JUN 2025`).
//! An amount ending in `C` is a credit to the card, everything else is a purchase.

use std::sync::LazyLock;

use regex::Regex;
use time::{Date, Month};

use crate::{
    account::AccountId,
    money::Money,
    statement::{
        ExtractError,
        parse::{collapse_whitespace, parse_amount, parse_day_month_year, statement_timestamp},
        tokenize::{Separators, tokenize},
    },
    transaction::{NewTransaction, TransactionKind},
};

static DAY_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})$").expect("day/month pattern is valid"));

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}(?:\.\d{3})*,\d{2})\s*([CD])?$").expect("amount pattern is valid")
});

static INSTALLMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}\s*(?:/|DE)\s*\d{1,2}$").expect("installment pattern is valid")
});

static INVOICE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{2} (?:JAN|FEV|MAR|ABR|MAI|JUN|JUL|AGO|SET|OUT|NOV|DEZ) \d{4}\b")
        .expect("invoice date pattern is valid")
});

/// Number of tokens every row has before the optional installment token.
const ROW_WIDTH: usize = 4;

pub(super) fn extract_transactions(
    text: &str,
    account_id: AccountId,
) -> Result<Vec<NewTransaction>, ExtractError> {
    let year = invoice_year(text).ok_or(ExtractError::MissingYear)?;
    let tokens = tokenize(text, Separators::LinesOnly);
    let mut transactions = Vec::new();
    let mut cursor = 0;

    while cursor < tokens.len() {
        if !starts_row(&tokens[cursor..]) {
            cursor += 1;
            continue;
        }

        let row = &tokens[cursor..cursor + ROW_WIDTH];
        cursor += ROW_WIDTH;

        // The installment token looks like a date, so only take it when it does not open the
        // next row.
        if let Some(next) = tokens.get(cursor)
            && INSTALLMENT.is_match(next)
            && !starts_row(&tokens[cursor..])
        {
            cursor += 1;
        }

        match parse_row(row, year, account_id) {
            Some(transaction) => transactions.push(transaction),
            None => tracing::debug!("skipping Caixa invoice row {row:?}"),
        }
    }

    Ok(transactions)
}

fn invoice_year(text: &str) -> Option<i32> {
    INVOICE_DATE
        .find_iter(text)
        .find_map(|found| parse_day_month_year(found.as_str()))
        .map(|date| date.year())
}

fn starts_row(tokens: &[&str]) -> bool {
    tokens.len() >= ROW_WIDTH
        && DAY_MONTH.is_match(tokens[0])
        && DAY_MONTH.is_match(tokens[1])
        && AMOUNT.is_match(tokens[3])
}

fn parse_row(row: &[&str], year: i32, account_id: AccountId) -> Option<NewTransaction> {
    let date = parse_day_month(row[0], year)?;
    let captures = AMOUNT.captures(row[3])?;
    let amount = parse_amount(&captures[1])?;

    if amount == Money::ZERO {
        return None;
    }

    let kind = match captures.get(2).map(|direction| direction.as_str()) {
        Some("C") => TransactionKind::Income,
        _ => TransactionKind::Expense,
    };

    Some(NewTransaction::new(
        account_id,
        kind,
        amount,
        statement_timestamp(date),
        collapse_whitespace(row[2]),
    ))
}

fn parse_day_month(text: &str, year: i32) -> Option<Date> {
    let captures = DAY_MONTH.captures(text)?;
    let day: u8 = captures[1].parse().ok()?;
    let month: u8 = captures[2].parse().ok()?;

    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}
