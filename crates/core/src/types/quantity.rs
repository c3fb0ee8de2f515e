//! Bounded line item quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// The requested value is outside `[Quantity::MIN, Quantity::MAX]`.
    #[error("quantity must be between {min} and {max} (got {value})", min = Quantity::MIN, max = Quantity::MAX)]
    OutOfRange {
        /// The rejected value.
        value: i64,
    },
}

/// Number of units of one line item a customer may request.
///
/// The cart accepts between 1 and 10 units per line item. Values coming back
/// from the server are taken as-is through [`Quantity::from_server`]; the bound
/// is enforced on every locally requested change.
///
/// ```
/// use redseam_core::Quantity;
///
/// assert!(Quantity::new(1).is_ok());
/// assert!(Quantity::new(10).is_ok());
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(11).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Smallest quantity a line item can hold.
    pub const MIN: u32 = 1;
    /// Largest quantity a customer may request for one line item.
    pub const MAX: u32 = 10;

    /// Create a quantity, rejecting values outside `[MIN, MAX]`.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::OutOfRange`] for values below 1 or above 10.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        u32::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(QuantityError::OutOfRange { value })
    }

    /// Wrap a quantity reported by the server without bound checks.
    #[must_use]
    pub const fn from_server(value: u32) -> Self {
        Self(value)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// One more unit, or `None` if already at [`Quantity::MAX`].
    #[must_use]
    pub const fn increment(self) -> Option<Self> {
        if self.0 >= Self::MAX {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }

    /// One fewer unit, or `None` if already at [`Quantity::MIN`].
    #[must_use]
    pub const fn decrement(self) -> Option<Self> {
        if self.0 <= Self::MIN {
            None
        } else if self.0 > Self::MAX {
            Some(Self(Self::MAX))
        } else {
            Some(Self(self.0 - 1))
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}
