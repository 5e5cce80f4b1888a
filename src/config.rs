//! Helpers for turning the server's flags and environment into usable settings.

use sha2::{Digest, Sha512};
use time::Duration;
use uuid::Uuid;

/// The token lifetime used when none is configured.
pub const DEFAULT_TOKEN_DURATION: &str = "24h";

/// The timezone used for "this month" when none is configured.
pub const DEFAULT_LOCAL_TIMEZONE: &str = "America/Sao_Paulo";

/// The errors that can occur while parsing a duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationParseError {
    /// The string was empty.
    #[error("the duration is empty")]
    Empty,

    /// A number was not followed by a unit, or the unit is not one of h, m, s or ms.
    #[error("invalid unit in duration \"{0}\"")]
    InvalidUnit(String),

    /// A unit was not preceded by a number.
    #[error("invalid number in duration \"{0}\"")]
    InvalidNumber(String),

    /// The duration was zero.
    #[error("the duration must be greater than zero")]
    NotPositive,
}

/// Parse a duration written as a sequence of numbers with units, e.g. `24h`, `90m`, `1h30m`,
/// `3600s` or `1.5h`.
///
/// # Errors
///
/// Returns a [DurationParseError] if the string is not a positive duration.
pub fn parse_duration(raw: &str) -> Result<Duration, DurationParseError> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let mut total = Duration::ZERO;
    let mut rest = raw;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| DurationParseError::InvalidUnit(raw.to_owned()))?;
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let number: f64 = number
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(raw.to_owned()))?;
        let seconds_per_unit = match unit {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            _ => return Err(DurationParseError::InvalidUnit(raw.to_owned())),
        };

        total += Duration::seconds_f64(number * seconds_per_unit);
        rest = tail;
    }

    if !total.is_positive() {
        return Err(DurationParseError::NotPositive);
    }

    Ok(total)
}

/// Use `configured` as the JWT secret, or generate a random one for this process.
pub fn jwt_secret_or_random(configured: Option<String>) -> String {
    match configured {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            tracing::warn!(
                "JWT_SECRET is not set, using a random secret. Tokens will stop working when the \
                 server restarts."
            );
            format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
        }
    }
}

/// Derive the 512 bit key used to sign tokens from `secret`.
pub fn signing_key(secret: &str) -> Vec<u8> {
    Sha512::digest(secret).to_vec()
}
