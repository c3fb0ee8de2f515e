//! Checkout: validate the customer, empty the server cart, issue a receipt.

use chrono::{DateTime, Utc};
use redseam_core::{CustomerDetails, LineItem, LineItemKey, ValidCustomerDetails};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::session::selector;
use super::{CartSession, CartTotals, CheckoutPolicy};
use crate::error::{CartError, Result, add_breadcrumb};

/// A line item the server refused to remove during checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRemoval {
    pub key: LineItemKey,
    pub error: CartError,
}

/// Record of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: Uuid,
    pub placed_at: DateTime<Utc>,
    pub customer: ValidCustomerDetails,
    /// Line items as they were when checkout started.
    pub items: Vec<LineItem>,
    pub totals: CartTotals,
    /// Removals that failed; only ever non-empty under
    /// [`CheckoutPolicy::BestEffort`].
    pub failed_removals: Vec<FailedRemoval>,
}

impl Receipt {
    /// Whether every line item was removed from the server cart.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_removals.is_empty()
    }
}

impl CartSession {
    /// Place the order for the current cart.
    ///
    /// Every line item is removed from the server cart one at a time. A failed
    /// removal is logged and does not stop the others. What happens next
    /// depends on [`CheckoutPolicy`]:
    ///
    /// - `BestEffort`: the local cart is cleared and a receipt listing the
    ///   failed removals is returned.
    /// - `Strict`: if any removal failed, the cart is reloaded from the server
    ///   and the first failure is returned.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for invalid customer details or an empty cart;
    ///   nothing is sent.
    /// - `Unauthenticated` without a usable token.
    /// - Under `Strict`, the first removal failure.
    #[instrument(skip_all, fields(policy = %self.settings().checkout_policy))]
    pub async fn checkout(&self, details: &CustomerDetails) -> Result<Receipt> {
        let customer = details.validate()?;

        let items = self.items().await;
        if items.is_empty() {
            return Err(CartError::ValidationFailed("cart is empty".to_string()));
        }

        let token = self.require_token().await?;
        self.cancel_pending_changes();

        add_breadcrumb("checkout", "Checkout started", None);

        let mut failed_removals = Vec::new();
        for item in &items {
            let key = item.key();
            match self
                .inner
                .api
                .remove_cart_item(&token, key.product_id, &selector(&key))
                .await
            {
                Ok(()) => self.forget_image(&key.image_key()).await,
                Err(e) => {
                    let error = self.remote_failure("checkout", e);
                    warn!(key = %key, error = %error, "Failed to remove line item during checkout");
                    failed_removals.push(FailedRemoval { key, error });
                }
            }
        }

        if self.settings().checkout_policy == CheckoutPolicy::Strict
            && let Some(first) = failed_removals.first()
        {
            let error = first.error.clone();
            if let Err(reload) = self.load_all().await {
                warn!(error = %reload, "Cart reload after failed checkout failed");
            }
            return Err(error);
        }

        self.clear_local().await;

        let totals = CartTotals::compute(&items, self.settings().delivery_fee);
        let receipt = Receipt {
            id: Uuid::new_v4(),
            placed_at: Utc::now(),
            customer,
            items,
            totals,
            failed_removals,
        };

        info!(
            receipt_id = %receipt.id,
            total = %receipt.totals.total,
            failed_removals = receipt.failed_removals.len(),
            "Checkout complete"
        );
        Ok(receipt)
    }
}
