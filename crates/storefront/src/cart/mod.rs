//! Cart session model.
//!
//! The server owns the cart. [`CartSession`] keeps a local mirror that is
//! replaced wholesale by every successful `GET /cart`, never patched in
//! place, and broadcasts [`CartEvent`]s so views can re-render without the
//! session knowing about them.
//!
//! # Example
//!
//! ```rust,ignore
//! let session = CartSession::new(Arc::new(client), credentials, config.cart);
//! let mut events = session.subscribe();
//!
//! session.add_item(ProductId::new(4), 1, "Blue", "L", Some(image)).await?;
//! session.increase_quantity(ProductId::new(4), "Blue", "L").await?;
//! session.flush().await;
//! ```

mod checkout;
mod debounce;
mod session;
mod totals;

#[cfg(test)]
pub(crate) mod testing;

pub use checkout::{FailedRemoval, Receipt};
pub use debounce::Debouncer;
pub use session::CartSession;
pub use totals::CartTotals;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use redseam_core::{LineItem, ProductId};
use secrecy::SecretString;

use crate::api::{ApiError, CartLine, CartLineRequest, CartLineSelector};

/// Remote cart operations the session depends on.
///
/// Implemented by [`RedseamClient`](crate::api::RedseamClient).
#[async_trait]
pub trait CartApi: Send + Sync {
    /// `POST /cart/products/{id}`
    async fn add_to_cart(
        &self,
        token: &SecretString,
        product_id: ProductId,
        line: &CartLineRequest,
    ) -> Result<CartLine, ApiError>;

    /// `GET /cart`
    async fn get_cart(&self, token: &SecretString) -> Result<Vec<CartLine>, ApiError>;

    /// `PATCH /cart/products/{id}`
    async fn update_cart_item(
        &self,
        token: &SecretString,
        product_id: ProductId,
        line: &CartLineRequest,
    ) -> Result<(), ApiError>;

    /// `DELETE /cart/products/{id}`
    async fn remove_cart_item(
        &self,
        token: &SecretString,
        product_id: ProductId,
        selector: &CartLineSelector,
    ) -> Result<(), ApiError>;
}

/// Line items and totals at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<LineItem>,
    pub totals: CartTotals,
}

/// Notifications for whatever renders the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// Local state was replaced.
    Updated(CartSnapshot),
    /// An item was added; show the cart panel.
    OpenCartPanel,
    /// No usable credential; hand over to the login flow.
    RedirectToLogin,
    /// A background operation failed.
    Error(String),
}

/// What checkout reports when some line items could not be removed from the
/// server cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutPolicy {
    /// Clear the local cart and report success, listing the failures on the
    /// receipt.
    #[default]
    BestEffort,
    /// Reload the cart from the server and report the first failure.
    Strict,
}

impl fmt::Display for CheckoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BestEffort => "best-effort",
            Self::Strict => "strict",
        })
    }
}

/// Error parsing a [`CheckoutPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown checkout policy '{0}' (expected 'best-effort' or 'strict')")]
pub struct ParsePolicyError(String);

impl FromStr for CheckoutPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" | "besteffort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}
