use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A bill amount held as an exact decimal rounded to two places.
///
/// Extraction works on `f64` because that is what the output contract carries;
/// anything that compares or sums amounts goes through `Money` so that
/// `0.1 + 0.2` style drift never leaks into dedup keys or totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    /// Rounds to two decimal places. `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(|d| Money(d.round_dp(2)))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).to_i64().unwrap_or(i64::MAX)
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_f64_rounds_to_cents() {
        assert_eq!(Money::from_f64(99.5).unwrap().to_cents(), 9950);
        assert_eq!(Money::from_f64(10.005).unwrap().to_cents(), 1000);
        assert_eq!(Money::from_f64(1234.567).unwrap().to_cents(), 123457);
    }

    #[test]
    fn from_f64_rejects_nan() {
        assert!(Money::from_f64(f64::NAN).is_none());
        assert!(Money::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn sum_has_no_float_drift() {
        let total: Money = [0.1, 0.2, 0.3]
            .iter()
            .filter_map(|v| Money::from_f64(*v))
            .sum();
        assert_eq!(total, Money::from_cents(60));
        assert_eq!(total.to_f64(), 0.6);
    }

    #[test]
    fn display_two_places() {
        assert_eq!(Money::from_cents(15000).to_string(), "150.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn abs_of_difference() {
        let a = Money::from_cents(10000);
        let b = Money::from_cents(15000);
        assert_eq!((a - b).abs(), Money::from_cents(5000));
    }
}
