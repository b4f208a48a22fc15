//! Fixed-point ADEAL token amounts.
//!
//! Ledger math must be exact, so amounts are stored as whole
//! milli-ADEAL (3 decimal places) in an `i64`. On the wire they appear
//! as plain JSON numbers (`0.05`), matching how balances are displayed.

use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MILLIS_PER_TOKEN: i64 = 1_000;

/// An ADEAL amount with millitoken resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct TokenAmount(i64);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub const fn from_milli(milli: i64) -> Self {
        TokenAmount(milli)
    }

    pub const fn as_milli(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(TokenAmount)
    }

    /// Converts a decimal token value (e.g. `0.05`) into millitokens.
    ///
    /// Rejects negatives, non-finite values, and anything with more
    /// than 3 decimal places, since such a value cannot be credited
    /// exactly.
    pub fn from_decimal(value: f64) -> Option<TokenAmount> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let scaled = value * MILLIS_PER_TOKEN as f64;
        if scaled > i64::MAX as f64 {
            return None;
        }
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return None;
        }
        Some(TokenAmount(rounded as i64))
    }

    fn to_decimal(self) -> f64 {
        self.0 as f64 / MILLIS_PER_TOKEN as f64
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MILLIS_PER_TOKEN;
        let frac = (self.0 % MILLIS_PER_TOKEN).abs();
        write!(f, "{whole}.{frac:03}")
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        TokenAmount::from_decimal(value).ok_or_else(|| {
            D::Error::custom(format!(
                "amount {value} is not a non-negative value with at most 3 decimal places"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_conversion_is_exact() {
        assert_eq!(TokenAmount::from_decimal(0.05), Some(TokenAmount(50)));
        assert_eq!(TokenAmount::from_decimal(0.02), Some(TokenAmount(20)));
        assert_eq!(TokenAmount::from_decimal(1.0), Some(TokenAmount(1_000)));
        assert_eq!(TokenAmount::from_decimal(0.0), Some(TokenAmount::ZERO));
    }

    #[test]
    fn rejects_sub_milli_precision() {
        assert_eq!(TokenAmount::from_decimal(0.0005), None);
        assert_eq!(TokenAmount::from_decimal(0.0101_5), None);
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert_eq!(TokenAmount::from_decimal(-0.01), None);
        assert_eq!(TokenAmount::from_decimal(f64::NAN), None);
        assert_eq!(TokenAmount::from_decimal(f64::INFINITY), None);
    }

    #[test]
    fn displays_three_decimal_places() {
        assert_eq!(TokenAmount(50).to_string(), "0.050");
        assert_eq!(TokenAmount(1_020).to_string(), "1.020");
        assert_eq!(TokenAmount::ZERO.to_string(), "0.000");
    }

    #[test]
    fn serde_round_trip() {
        let amount: TokenAmount = serde_json::from_str("0.05").unwrap();
        assert_eq!(amount, TokenAmount(50));
        assert_eq!(serde_json::to_string(&amount).unwrap(), "0.05");

        let err = serde_json::from_str::<TokenAmount>("0.0001").unwrap_err();
        assert!(err.to_string().contains("3 decimal places"));
    }

    #[test]
    fn checked_add_returns_none_on_overflow() {
        let a = TokenAmount(i64::MAX);
        assert_eq!(a.checked_add(TokenAmount(1)), None);
        assert_eq!(
            TokenAmount(30).checked_add(TokenAmount(20)),
            Some(TokenAmount(50))
        );
    }
}
