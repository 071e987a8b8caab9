//! Product ids, money amounts and order lines.

use serde::{Deserialize, Serialize};

/// Product identifier (SKU). Unique within one order: a second add for the
/// same id replaces the existing line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        ProductId::new(id)
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        ProductId(id)
    }
}

/// Monetary amount in integer cents.
///
/// Prices and totals never touch floating point inside the domain;
/// [`from_decimal`](Money::from_decimal) and
/// [`to_decimal`](Money::to_decimal) exist solely for the HTTP boundary,
/// where amounts travel as JSON numbers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Wraps an amount already expressed in cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a decimal amount (`10.00`) to cents, rounding to the
    /// nearest cent.
    pub fn from_decimal(value: f64) -> Self {
        Self::from_cents((value * 100.0).round() as i64)
    }

    pub fn zero() -> Self {
        Self::from_cents(0)
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Decimal form for response bodies.
    pub fn to_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Whole-currency part of the amount.
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Fractional part of the amount, always 0..=99.
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Scales the amount by a line quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money::from_cents(self.cents * i64::from(quantity))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        write!(f, "{sign}${}.{:02}", self.dollars().abs(), self.cents_part())
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money::from_cents(self.cents + rhs.cents)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |total, amount| total + amount)
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    /// Always positive; validated before the line is created.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Money,
}

impl OrderItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Line total: quantity × unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_converts_from_strings() {
        let id = ProductId::new("P1");
        assert_eq!(id.as_str(), "P1");
        assert_eq!(id.to_string(), "P1");

        let from_owned: ProductId = "P2".to_string().into();
        let from_slice: ProductId = "P2".into();
        assert_eq!(from_owned, from_slice);
    }

    #[test]
    fn money_splits_dollars_and_cents() {
        let amount = Money::from_cents(4521);
        assert_eq!(amount.cents(), 4521);
        assert_eq!(amount.dollars(), 45);
        assert_eq!(amount.cents_part(), 21);
    }

    #[test]
    fn decimal_boundary_round_trips() {
        assert_eq!(Money::from_decimal(19.99).cents(), 1999);
        assert_eq!(Money::from_decimal(12.345).cents(), 1235);
        assert_eq!(Money::from_decimal(0.1).cents(), 10);
        assert_eq!(Money::from_cents(4000).to_decimal(), 40.0);
    }

    #[test]
    fn display_formats_with_currency_sign() {
        assert_eq!(Money::from_cents(2307).to_string(), "$23.07");
        assert_eq!(Money::from_cents(40).to_string(), "$0.40");
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(-907).to_string(), "-$9.07");
    }

    #[test]
    fn sum_and_multiply_stay_in_cents() {
        let total: Money = [Money::from_cents(750).multiply(3), Money::from_cents(240)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 2490);
        assert_eq!(Money::zero() + Money::from_cents(1), Money::from_cents(1));
    }

    #[test]
    fn sign_predicates() {
        assert!(Money::from_cents(100).is_positive());
        assert!(!Money::from_cents(0).is_positive());
        assert!(!Money::from_cents(-100).is_positive());
    }

    #[test]
    fn line_total_scales_unit_price() {
        let item = OrderItem::new("P7", "Desk lamp", 4, Money::from_cents(1125));
        assert_eq!(item.line_total().cents(), 4500);
        assert_eq!(item.line_total().to_string(), "$45.00");
    }
}
