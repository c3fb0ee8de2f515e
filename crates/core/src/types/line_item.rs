//! Cart line items and their identity.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::{Price, ProductId, Quantity};

/// Identity of a cart line item: the same product in another color or size
/// is a different line item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineItemKey {
    pub product_id: ProductId,
    pub color: String,
    pub size: String,
}

impl LineItemKey {
    /// Create a new identity key.
    #[must_use]
    pub fn new(product_id: ProductId, color: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            product_id,
            color: color.into(),
            size: size.into(),
        }
    }

    /// Key of the per-color image reference this line item uses.
    #[must_use]
    pub fn image_key(&self) -> ImageKey {
        ImageKey {
            product_id: self.product_id,
            color: self.color.clone(),
        }
    }
}

impl fmt::Display for LineItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.product_id, self.color, self.size)
    }
}

/// Key of the display image remembered for a product in a given color.
///
/// Sizes share an image, so the size is not part of this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageKey {
    pub product_id: ProductId,
    pub color: String,
}

impl ImageKey {
    /// Create a new image key.
    #[must_use]
    pub fn new(product_id: ProductId, color: impl Into<String>) -> Self {
        Self {
            product_id,
            color: color.into(),
        }
    }
}

/// One (product, color, size) selection in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    /// Server-assigned price of one unit.
    pub unit_price: Price,
    pub color: String,
    pub size: String,
    pub quantity: Quantity,
    /// Display image; `None` when neither the server nor the local
    /// image table knows one.
    pub image: Option<String>,
}

impl LineItem {
    /// Identity key of this line item.
    #[must_use]
    pub fn key(&self) -> LineItemKey {
        LineItemKey::new(self.product_id, self.color.clone(), self.size.clone())
    }

    /// Whether this line item has the given identity.
    #[must_use]
    pub fn matches(&self, key: &LineItemKey) -> bool {
        self.product_id == key.product_id && self.color == key.color && self.size == key.size
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(color: &str, size: &str) -> LineItem {
        LineItem {
            product_id: ProductId::new(1),
            name: "Linen Shirt".to_string(),
            unit_price: Price::from_cents(2000),
            color: color.to_string(),
            size: size.to_string(),
            quantity: Quantity::from_server(2),
            image: None,
        }
    }

    #[test]
    fn test_key_distinguishes_color_and_size() {
        let a = item("Blue", "M");
        let b = item("Blue", "L");
        let c = item("Red", "M");
        assert_ne!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert!(a.matches(&LineItemKey::new(ProductId::new(1), "Blue", "M")));
        assert!(!a.matches(&b.key()));
    }

    #[test]
    fn test_image_key_ignores_size() {
        assert_eq!(item("Blue", "M").key().image_key(), item("Blue", "L").key().image_key());
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item("Blue", "M").line_total(), Price::from_cents(4000));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(item("Blue", "M").key().to_string(), "1-Blue-M");
    }
}
