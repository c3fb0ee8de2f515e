//! Core types for RedSeam.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod customer;
pub mod email;
pub mod id;
pub mod line_item;
pub mod price;
pub mod quantity;

pub use customer::{CustomerDetails, CustomerDetailsError, ValidCustomerDetails};
pub use email::{Email, EmailError};
pub use id::*;
pub use line_item::{ImageKey, LineItem, LineItemKey};
pub use price::Price;
pub use quantity::{Quantity, QuantityError};
