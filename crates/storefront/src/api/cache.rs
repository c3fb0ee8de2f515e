//! Cache types for catalogue responses.

use super::types::{Product, ProductPage};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
}
