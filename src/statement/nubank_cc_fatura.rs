//! Nubank credit card invoices.
//!
//! The year is only printed in the invoice header, postings carry day and month:
//!
//! ```text
//! TRANSAÇÕES
//! 09 MAI
//! •••• 1234
//! Hostel Alemanha - Parcela 7/10
//! R$ 299,80
//! Pagamentos
//! 30 MAI
//! Pagamento em 30 MAI
//! −R$ 381,30
//! ```
//!
//! The payments section prints amounts with U+2212 MINUS SIGN.

use std::sync::LazyLock;

use regex::Regex;
use time::Date;

use crate::{
    account::AccountId,
    statement::{
        ExtractError,
        parse::{day_month_year, parse_amount, statement_timestamp},
        tokenize::{Separators, tokenize},
    },
    transaction::{NewTransaction, TransactionKind},
};

const TRANSACTIONS_MARKER: &str = "TRANSAÇÕES";
const PAYMENTS_MARKER: &str = "Pagamentos";

static YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Data de vencimento:|FATURA) \d{2} [A-Z]{3} (\d{4})")
        .expect("invoice year pattern is valid")
});

static DAY_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}) ([A-Z]{3})$").expect("day month pattern is valid"));

static CARD_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^•••• \d{4}$").expect("card digits pattern is valid"));

static CHARGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^R\$ (\d{1,3}(?:\.\d{3})*,\d{2})$").expect("charge pattern is valid")
});

static PAYMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^−R\$ (\d{1,3}(?:\.\d{3})*,\d{2})$").expect("payment pattern is valid")
});

#[derive(Debug, Clone, Copy)]
enum Section {
    Charges,
    Payments,
}

impl Section {
    fn amount_pattern(self) -> &'static Regex {
        match self {
            Section::Charges => &*CHARGE,
            Section::Payments => &*PAYMENT,
        }
    }

    fn kind(self) -> TransactionKind {
        match self {
            Section::Charges => TransactionKind::Expense,
            Section::Payments => TransactionKind::Income,
        }
    }
}

pub(super) fn extract_transactions(
    text: &str,
    account_id: AccountId,
) -> Result<Vec<NewTransaction>, ExtractError> {
    let year = invoice_year(text).ok_or(ExtractError::MissingYear)?;
    let lines = tokenize(text, Separators::LinesOnly);

    let charges_start = lines
        .iter()
        .position(|line| *line == TRANSACTIONS_MARKER)
        .ok_or_else(|| ExtractError::MissingMarker(TRANSACTIONS_MARKER.to_owned()))?
        + 1;

    let payments_start = lines[charges_start..]
        .iter()
        .position(|line| *line == PAYMENTS_MARKER)
        .map(|offset| charges_start + offset + 1);

    let charges_end = payments_start.map_or(lines.len(), |start| start - 1);

    let mut transactions = scan_section(
        &lines[charges_start..charges_end],
        Section::Charges,
        year,
        account_id,
    );

    if let Some(start) = payments_start {
        transactions.extend(scan_section(
            &lines[start..],
            Section::Payments,
            year,
            account_id,
        ));
    }

    Ok(transactions)
}

fn invoice_year(text: &str) -> Option<i32> {
    YEAR.captures(text)
        .and_then(|captures| captures[1].parse().ok())
}

fn scan_section(
    lines: &[&str],
    section: Section,
    year: i32,
    account_id: AccountId,
) -> Vec<NewTransaction> {
    let mut transactions = Vec::new();
    let mut current_date: Option<Date> = None;

    for (index, line) in lines.iter().enumerate() {
        if let Some(captures) = DAY_MONTH.captures(line) {
            current_date = day_month_year(&captures[1], &captures[2], year);
            continue;
        }

        if CARD_DIGITS.is_match(line) {
            continue;
        }

        let Some(captures) = section.amount_pattern().captures(line) else {
            continue;
        };

        let description = match index.checked_sub(1).map(|previous| lines[previous]) {
            Some(description) => description,
            None => {
                tracing::debug!("skipping Nubank invoice amount \"{line}\" without a description");
                continue;
            }
        };

        let (Some(date), Some(amount)) = (current_date, parse_amount(&captures[1])) else {
            tracing::debug!("skipping Nubank invoice row \"{description}\" / \"{line}\"");
            continue;
        };

        if !amount.is_positive() {
            continue;
        }

        transactions.push(NewTransaction::new(
            account_id,
            section.kind(),
            amount,
            statement_timestamp(date),
            description,
        ));
    }

    transactions
}
