//! Derived cart totals.

use redseam_core::{LineItem, Price};
use serde::Serialize;

/// Totals derived from the current line items. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Σ unit price × quantity
    pub subtotal: Price,
    pub delivery_fee: Price,
    /// Subtotal plus delivery fee
    pub total: Price,
    /// Σ quantity
    pub item_count: u32,
    /// Number of distinct line items
    pub line_count: usize,
}

impl CartTotals {
    /// Compute totals for `items` with a flat `delivery_fee`.
    #[must_use]
    pub fn compute(items: &[LineItem], delivery_fee: Price) -> Self {
        let subtotal: Price = items.iter().map(LineItem::line_total).sum();
        Self {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
            item_count: items.iter().map(|item| item.quantity.get()).sum(),
            line_count: items.len(),
        }
    }

    /// Totals of an empty cart.
    #[must_use]
    pub fn empty(delivery_fee: Price) -> Self {
        Self::compute(&[], delivery_fee)
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.line_count == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redseam_core::{ProductId, Quantity};

    use super::*;

    fn item(id: i32, cents: i64, quantity: i64) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Price::from_cents(cents),
            color: "Black".to_string(),
            size: "M".to_string(),
            quantity: Quantity::new(quantity).unwrap(),
            image: None,
        }
    }

    #[test]
    fn test_subtotal_and_total() {
        let items = vec![item(1, 2000, 2), item(2, 1550, 1)];
        let totals = CartTotals::compute(&items, Price::from_cents(500));

        assert_eq!(totals.subtotal, Price::from_cents(5550));
        assert_eq!(totals.total, Price::from_cents(6050));
        assert_eq!(totals.subtotal.to_string(), "$ 55.50");
        assert_eq!(totals.total.to_string(), "$ 60.50");
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.line_count, 2);
    }

    #[test]
    fn test_empty_cart() {
        let totals = CartTotals::empty(Price::from_cents(500));
        assert!(totals.is_empty());
        assert_eq!(totals.subtotal, Price::ZERO);
        assert_eq!(totals.total, Price::from_cents(500));
        assert_eq!(totals.item_count, 0);
    }
}
