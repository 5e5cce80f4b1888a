//! Fixed-point money amounts.
//!
//! Amounts and balances are stored as a whole number of cents so that the database can add
//! deltas with `balance = balance + ?` without any floating point drift. At the JSON boundary
//! they are written as decimal strings with two fractional digits, e.g. `"5112.83"`.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// A signed amount of money with two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// No money at all.
    pub const ZERO: Money = Money(0);

    /// Create an amount from a whole number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount as a whole number of cents.
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// The amount as a decimal with exactly two fractional digits.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Whether the amount is strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<Decimal> for Money {
    type Error = Error;

    /// Convert a decimal to money.
    ///
    /// # Errors
    /// Returns [Error::InvalidRequest] if `value` has more than two significant fractional
    /// digits or does not fit in 64 bits of cents.
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.normalize().scale() > 2 {
            return Err(Error::InvalidRequest(format!(
                "the amount {value} has more than two decimal places"
            )));
        }

        value
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Money)
            .ok_or_else(|| Error::InvalidRequest(format!("the amount {value} is out of range")))
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|error| Error::InvalidRequest(format!("invalid amount \"{s}\": {error}")))?;

        Money::try_from(decimal)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_decimal().fmt(f)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let decimal = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::try_from(decimal).map_err(serde::de::Error::custom)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Money)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::{Error, money::Money};

    #[test]
    fn displays_two_fractional_digits() {
        assert_eq!(Money::from_cents(511283).to_string(), "5112.83");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::from_cents(10000).to_string(), "100.00");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!(Money::from_str("100"), Ok(Money::from_cents(10000)));
        assert_eq!(Money::from_str("0.1"), Ok(Money::from_cents(10)));
        assert_eq!(Money::from_str("-40.25"), Ok(Money::from_cents(-4025)));
        assert_eq!(Money::from_str("1.230"), Ok(Money::from_cents(123)));
    }

    #[test]
    fn rejects_sub_cent_precision() {
        let result = Money::try_from(Decimal::new(1001, 3));

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn addition_does_not_drift() {
        let total: Money = [Money::from_str("0.1"), Money::from_str("0.2")]
            .into_iter()
            .map(Result::unwrap)
            .sum();

        assert_eq!(total, Money::from_str("0.3").unwrap());
    }

    #[test]
    fn json_round_trip_uses_decimal_strings() {
        let json = serde_json::to_string(&Money::from_cents(29980)).unwrap();
        assert_eq!(json, "\"299.80\"");

        let from_number: Money = serde_json::from_str("40").unwrap();
        assert_eq!(from_number, Money::from_cents(4000));

        let too_precise = serde_json::from_str::<Money>("\"1.005\"");
        assert!(too_precise.is_err());
    }
}
