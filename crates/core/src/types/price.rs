//! Type-safe price representation using decimal arithmetic.
//!
//! Prices come from the remote catalogue as plain numbers in the store's
//! single currency. All arithmetic happens on [`Decimal`] so that cart
//! totals never pick up binary floating point drift.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency symbol used for display.
pub const CURRENCY_SYMBOL: &str = "$";

/// A monetary amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    /// Formats with exactly two decimal places, e.g. `$ 55.50`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CURRENCY_SYMBOL} {:.2}", self.0.round_dp(2))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        self.times(rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimal_places() {
        assert_eq!(Price::new(Decimal::new(555, 1)).to_string(), "$ 55.50");
        assert_eq!(Price::new(Decimal::from(5)).to_string(), "$ 5.00");
        assert_eq!(Price::ZERO.to_string(), "$ 0.00");
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(1550).amount(), Decimal::new(1550, 2));
        assert_eq!(Price::from_cents(-5).amount(), Decimal::new(-5, 2));
    }

    #[test]
    fn test_times_and_sum() {
        let lines = [Price::from_cents(2000).times(2), Price::from_cents(1550) * 1];
        let subtotal: Price = lines.into_iter().sum();
        assert_eq!(subtotal, Price::from_cents(5550));
    }

    #[test]
    fn test_deserializes_from_json_number_and_string() {
        let from_number: Price = serde_json::from_str("15.5").unwrap();
        let from_string: Price = serde_json::from_str("\"15.50\"").unwrap();
        assert_eq!(from_number, from_string);
    }
}
