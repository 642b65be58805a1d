//! Value Objects for the admin client

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Currency symbol appended to every formatted amount.
pub const CURRENCY_SYMBOL: &str = "₫";

/// Money value object.
///
/// Amounts are Vietnamese dong, which has no minor unit. The backend sends
/// plain JSON numbers, so the amount is carried as a float on the wire and as
/// a [`Decimal`] everywhere else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn dong(amount: i64) -> Self { Self(Decimal::from(amount)) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Formats the amount with `.` thousands separators and a trailing symbol,
    /// e.g. `1.250.000 ₫`.
    pub fn format(&self) -> String {
        let rounded = self.0.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let digits = rounded.abs().trunc().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        format!("{sign}{grouped} {CURRENCY_SYMBOL}")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.format()) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money(self.0 - rhs.0) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), Add::add) }
}

/// Inclusive price range shown for products whose variants differ in price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceRange { pub min: Money, pub max: Money }

impl PriceRange {
    pub fn single(price: Money) -> Self { Self { min: price, max: price } }

    pub fn of(prices: impl IntoIterator<Item = Money>) -> Option<Self> {
        prices.into_iter().fold(None, |acc, p| match acc {
            None => Some(Self::single(p)),
            Some(r) => Some(Self { min: r.min.min(p), max: r.max.max(p) }),
        })
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max { write!(f, "{}", self.min) } else { write!(f, "{} - {}", self.min, self.max) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_format() {
        assert_eq!(Money::dong(0).format(), "0 ₫");
        assert_eq!(Money::dong(999).format(), "999 ₫");
        assert_eq!(Money::dong(1000).format(), "1.000 ₫");
        assert_eq!(Money::dong(1_250_000).format(), "1.250.000 ₫");
        assert_eq!(Money::dong(-45_500).format(), "-45.500 ₫");
        assert_eq!(Money::new(Decimal::new(19995, 1)).format(), "2.000 ₫");
    }

    #[test]
    fn test_money_arithmetic() {
        let total: Money = [Money::dong(100), Money::dong(50)].into_iter().sum();
        assert_eq!(total, Money::dong(150));
        assert_eq!(Money::dong(120).multiply(3), Money::dong(360));
        assert!((Money::dong(10) - Money::dong(20)).is_negative());
    }

    #[test]
    fn test_money_wire_format() {
        let m: Money = serde_json::from_str("125000").unwrap();
        assert_eq!(m, Money::dong(125_000));
        assert_eq!(serde_json::to_string(&Money::dong(7)).unwrap(), "7.0");
    }

    #[test]
    fn test_price_range() {
        let r = PriceRange::of([Money::dong(300), Money::dong(100), Money::dong(200)]).unwrap();
        assert_eq!(r.to_string(), "100 ₫ - 300 ₫");
        assert_eq!(PriceRange::single(Money::dong(5000)).to_string(), "5.000 ₫");
        assert!(PriceRange::of(Vec::new()).is_none());
    }
}
