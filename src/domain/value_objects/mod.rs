//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// Monetary amount in the store currency.
///
/// The storefront runs on a single currency, so amounts carry no currency
/// code; formatting with a symbol is left to [`Money::format`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn from_major(amount: i64) -> Self { Self(Decimal::from(amount)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Scales the amount by `percent / 100`.
    pub fn percent(&self, percent: Decimal) -> Money { Money(self.0 * percent / Decimal::ONE_HUNDRED) }

    /// Whole-unit display, e.g. `৳1250`.
    pub fn format(&self, symbol: &str) -> String { format!("{}{}", symbol, self.0.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)) }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self(amount) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money(self.0 - rhs.0) }
}

impl Mul<u32> for Money {
    type Output = Money;
    fn mul(self, qty: u32) -> Money { self.multiply(qty) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Discount percentage as entered by the store operator.
///
/// Values outside `0..=100` are accepted as-is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountPercentage(Decimal);

impl DiscountPercentage {
    pub fn new(value: Decimal) -> Self { Self(value) }
    pub fn value(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
}

/// Identity of a cart line: product plus variant selectors.
///
/// An absent selector never equals a present one, including `Some("")`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineKey<'a> {
    pub product_id: &'a str,
    pub size: Option<&'a str>,
    pub color: Option<&'a str>,
}

impl<'a> LineKey<'a> {
    pub fn new(product_id: &'a str, size: Option<&'a str>, color: Option<&'a str>) -> Self {
        Self { product_id, size, color }
    }
}

impl fmt::Display for LineKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product_id)?;
        if let Some(size) = self.size { write!(f, "/size={}", size)?; }
        if let Some(color) = self.color { write!(f, "/color={}", color)?; }
        Ok(())
    }
}

/// Reduces a phone number to ASCII digits, translating Bengali numerals.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '০'..='৯' => char::from(b'0' + (c as u32 - '০' as u32) as u8),
            other => other,
        })
        .filter(char::is_ascii_digit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_major(100);
        let b = Money::from_major(50);
        assert_eq!((a + b).amount(), Decimal::new(150, 0));
        assert_eq!(a.multiply(3), Money::from_major(300));
        assert_eq!(a.percent(Decimal::new(20, 0)), Money::from_major(20));
        assert_eq!(vec![a, b, b].into_iter().sum::<Money>(), Money::from_major(200));
    }

    #[test]
    fn test_money_format() {
        assert_eq!(Money::new(Decimal::new(12504, 1)).format("৳"), "৳1250");
    }

    #[test]
    fn test_line_key_absent_differs_from_empty() {
        assert_ne!(LineKey::new("p1", None, None), LineKey::new("p1", Some(""), None));
        assert_eq!(LineKey::new("p1", Some("M"), None), LineKey::new("p1", Some("M"), None));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("০১৭১২-৩৪৫৬৭৮"), "01712345678");
        assert_eq!(normalize_phone("+880 1712 345678"), "8801712345678");
        assert_eq!(normalize_phone(""), "");
    }
}
