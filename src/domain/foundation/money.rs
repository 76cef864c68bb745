//! Money value object for deposit and bid amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// ISO-4217 currency code, upper-cased, three letters.
///
/// Serialized as its string form (`"INR"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    /// Indian rupee, the platform default.
    pub const INR: Currency = Currency(*b"INR");

    /// Parses a three-letter currency code.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the code is not three ASCII letters.
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("expected a three-letter code, got '{}'", code),
            ));
        }
        let mut out = [0u8; 3];
        for (i, b) in bytes.iter().enumerate() {
            out[i] = b.to_ascii_uppercase();
        }
        Ok(Self(out))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Currency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Currency::parse(&code).map_err(serde::de::Error::custom)
    }
}

/// Monetary amount in minor units (paise, cents) with its currency.
///
/// Minor units avoid floating-point rounding in comparisons against
/// deposit floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates a non-negative amount.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `amount_minor` is negative.
    pub fn new(amount_minor: i64, currency: Currency) -> Result<Self, ValidationError> {
        if amount_minor < 0 {
            return Err(ValidationError::negative("amount", amount_minor));
        }
        Ok(Self {
            amount_minor,
            currency,
        })
    }

    /// Returns the amount in minor units.
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// True when self covers `floor` in the same currency.
    ///
    /// Amounts in different currencies never cover each other.
    pub fn covers(&self, floor: &Money) -> bool {
        self.currency == floor.currency && self.amount_minor >= floor.amount_minor
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_minor, self.currency)
    }
}
