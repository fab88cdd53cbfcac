//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An item price in the catalog's display currency (USD).
///
/// Serialized as a plain JSON number so item payloads keep the same shape
/// front ends already expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of dollars.
    #[must_use]
    pub fn from_whole(dollars: u32) -> Self {
        Self(Decimal::from(dollars))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_has_two_decimals() {
        assert_eq!(Price::from_whole(42).to_string(), "$42.00");
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Price::from_whole(10)).unwrap();
        assert_eq!(json, "10.0");
    }

    #[test]
    fn test_deserializes_from_number() {
        let price: Price = serde_json::from_str("19.5").unwrap();
        assert_eq!(price.to_string(), "$19.50");
    }
}
