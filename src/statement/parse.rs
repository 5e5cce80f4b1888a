//! Amount and date decoding for the formats printed by Brazilian banks.
//!
//! Amounts look like `5.112,83`, optionally prefixed with `R$ ` or `−R$ `. Dates come as
//! `DD/MM/YYYY`, `DD-MM-YYYY` or, on credit card invoices, `DD MON YYYY` with Portuguese month
//! codes. Every decoder returns `None` on failure so that extractors can skip the row.

use std::str::FromStr;

use rust_decimal::Decimal;
use time::{
    Date, Month, OffsetDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::money::Money;

const SLASH_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[day]/[month]/[year]");
const DASH_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[day]-[month]-[year]");

/// Currency markers, longest first so that a signed marker is not mistaken for `R$`.
const CURRENCY_MARKERS: [&str; 3] = ["−R$", "-R$", "R$"];

/// Decode a Brazilian formatted amount into its magnitude.
///
/// The currency marker and any sign are dropped, `.` thousands separators are removed and the
/// comma becomes the decimal point. A fractional part, if present, must have exactly two
/// digits.
pub fn parse_amount(text: &str) -> Option<Money> {
    let mut text = text.trim();

    for marker in CURRENCY_MARKERS {
        if let Some(rest) = text.strip_prefix(marker) {
            text = rest.trim_start();
            break;
        }
    }

    let text = text.trim_start_matches(['-', '−', '+']).trim_start();

    let (integer, fraction) = match text.split_once(',') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text, None),
    };

    if integer.is_empty() || !integer.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let integer = integer.replace('.', "");
    let normalized = match fraction {
        Some(fraction) if fraction.len() == 2 && fraction.chars().all(|c| c.is_ascii_digit()) => {
            format!("{integer}.{fraction}")
        }
        Some(_) => return None,
        None => integer,
    };

    Decimal::from_str(&normalized)
        .ok()
        .and_then(|decimal| Money::try_from(decimal).ok())
}

/// Decode a `DD/MM/YYYY` or `DD-MM-YYYY` date.
pub fn parse_date(text: &str) -> Option<Date> {
    let text = text.trim();

    Date::parse(text, SLASH_DATE_FORMAT)
        .or_else(|_| Date::parse(text, DASH_DATE_FORMAT))
        .ok()
}

/// Map an upper-case Portuguese three letter month code, e.g. `FEV`, to a [Month].
pub fn parse_month(code: &str) -> Option<Month> {
    let month = match code {
        "JAN" => Month::January,
        "FEV" => Month::February,
        "MAR" => Month::March,
        "ABR" => Month::April,
        "MAI" => Month::May,
        "JUN" => Month::June,
        "JUL" => Month::July,
        "AGO" => Month::August,
        "SET" => Month::September,
        "OUT" => Month::October,
        "NOV" => Month::November,
        "DEZ" => Month::December,
        _ => return None,
    };

    Some(month)
}

/// Build a date from a day number, a Portuguese month code and a year.
pub fn day_month_year(day: &str, month_code: &str, year: i32) -> Option<Date> {
    let day: u8 = day.parse().ok()?;
    let month = parse_month(month_code)?;

    Date::from_calendar_date(year, month, day).ok()
}

/// Decode a date written as `DD MON YYYY`, e.g. `02 JUN 2025`.
///
/// The text must consist of exactly three whitespace separated fields.
pub fn parse_day_month_year(text: &str) -> Option<Date> {
    let fields: Vec<&str> = text.split_whitespace().collect();

    match fields.as_slice() {
        [day, month_code, year] => day_month_year(day, month_code, year.parse().ok()?),
        _ => None,
    }
}

/// The timestamp used for a posting that only has a calendar date: midnight UTC.
pub fn statement_timestamp(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
