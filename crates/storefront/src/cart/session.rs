//! Cart session: local mirror of the server cart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use redseam_core::{ImageKey, LineItem, LineItemKey, ProductId, Quantity};
use secrecy::SecretString;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, instrument, warn};

use super::debounce::Debouncer;
use super::{CartApi, CartEvent, CartSnapshot, CartTotals};
use crate::api::{ApiError, CartLineRequest, CartLineSelector};
use crate::config::CartSettings;
use crate::error::{CartError, Result, add_breadcrumb, capture_cart_error};
use crate::store::{CredentialStore, ImageRefTable};

/// Events buffered per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Handle to a cart session.
///
/// Cheap to clone; clones share state. Local state is only ever replaced by a
/// fresh server listing, never patched from a request that was merely sent.
#[derive(Clone)]
pub struct CartSession {
    pub(super) inner: Arc<SessionInner>,
}

pub(super) struct SessionInner {
    pub(super) api: Arc<dyn CartApi>,
    pub(super) credentials: CredentialStore,
    pub(super) images: ImageRefTable,
    pub(super) settings: CartSettings,
    state: RwLock<CartState>,
    /// Sequence number of the most recently started fetch.
    fetch_seq: AtomicU64,
    debouncer: Debouncer<QuantityChange>,
    events: broadcast::Sender<CartEvent>,
}

struct CartState {
    items: Vec<LineItem>,
    totals: CartTotals,
    /// Sequence number of the fetch that produced `items`.
    applied_seq: u64,
}

/// Quantity update waiting in the debouncer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QuantityChange {
    key: LineItemKey,
    target: Quantity,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Up,
    Down,
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl CartSession {
    /// Create an empty session. Call [`load_all`](Self::load_all) to populate.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, credentials: CredentialStore, settings: CartSettings) -> Self {
        let images = ImageRefTable::new(credentials.durable());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(SessionInner {
                api,
                credentials,
                images,
                settings,
                state: RwLock::new(CartState {
                    items: Vec::new(),
                    totals: CartTotals::empty(settings.delivery_fee),
                    applied_seq: 0,
                }),
                fetch_seq: AtomicU64::new(0),
                debouncer: Debouncer::new(settings.debounce),
                events,
            }),
        }
    }

    /// Receive [`CartEvent`]s from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    /// Session settings.
    #[must_use]
    pub fn settings(&self) -> &CartSettings {
        &self.inner.settings
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// Current line items.
    pub async fn items(&self) -> Vec<LineItem> {
        self.inner.state.read().await.items.clone()
    }

    /// Current totals.
    pub async fn totals(&self) -> CartTotals {
        self.inner.state.read().await.totals
    }

    /// Current line items and totals, read together.
    pub async fn snapshot(&self) -> CartSnapshot {
        let state = self.inner.state.read().await;
        CartSnapshot {
            items: state.items.clone(),
            totals: state.totals,
        }
    }

    /// Line item with the given identity, if present locally.
    pub async fn find(&self, key: &LineItemKey) -> Option<LineItem> {
        self.inner
            .state
            .read()
            .await
            .items
            .iter()
            .find(|item| item.matches(key))
            .cloned()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product in the given color and size.
    ///
    /// On success the image shown to the user is remembered for the cart
    /// listing, the cart is reloaded and [`CartEvent::OpenCartPanel`] is
    /// emitted. A failed reload after a successful add is reported as
    /// [`CartEvent::Error`] and does not fail the add.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a quantity outside 1..=10 or a blank color or
    ///   size; nothing is sent.
    /// - `Unauthenticated` without a usable token; emits
    ///   [`CartEvent::RedirectToLogin`].
    /// - `RemoteRejected` / `Network` if the server refuses or cannot be
    ///   reached; local state and the image table are left untouched.
    #[instrument(skip(self, image_url), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: i64,
        color: &str,
        size: &str,
        image_url: Option<&str>,
    ) -> Result<LineItem> {
        if quantity < 1 {
            return Err(CartError::ValidationFailed(
                "quantity must be a positive integer".to_string(),
            ));
        }
        let quantity = Quantity::new(quantity)?;
        let color = non_blank("color", color)?;
        let size = non_blank("size", size)?;

        let token = self.require_token().await?;

        let product = product_id.to_string();
        add_breadcrumb(
            "cart",
            "Adding line item",
            Some(&[("product_id", product.as_str()), ("color", color), ("size", size)]),
        );

        let request = CartLineRequest {
            quantity: quantity.get(),
            color: color.to_string(),
            size: size.to_string(),
        };
        let line = self
            .inner
            .api
            .add_to_cart(&token, product_id, &request)
            .await
            .map_err(|e| self.remote_failure("add_item", e))?;

        let image_url = image_url.map(str::trim).filter(|url| !url.is_empty());
        if let Some(url) = image_url {
            self.remember_image(&ImageKey::new(product_id, color), url)
                .await;
        }

        if let Err(err) = self.load_all().await {
            warn!(error = %err, "Cart reload after add failed");
            self.emit(CartEvent::Error(err.to_string()));
        }
        self.emit(CartEvent::OpenCartPanel);

        let mut item = line.into_line_item();
        if item.image.is_none() {
            item.image = image_url.map(ToOwned::to_owned);
        }
        Ok(item)
    }

    /// Replace local state with the server cart.
    ///
    /// Items the server returns without an image get the one remembered for
    /// their product and color. A response is applied only if no fetch that
    /// started later has been applied already; a stale response leaves the
    /// newer state in place and returns it.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without a usable token; emits
    ///   [`CartEvent::RedirectToLogin`] and leaves local state untouched.
    /// - `RemoteRejected` / `Network` on failure; local state is untouched.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<LineItem>> {
        let seq = self.next_seq();
        let token = self.require_token().await?;

        let lines = self
            .inner
            .api
            .get_cart(&token)
            .await
            .map_err(|e| self.remote_failure("load_all", e))?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let mut item = line.into_line_item();
            if item.image.is_none() {
                item.image = self.lookup_image(&item.key().image_key()).await;
            }
            items.push(item);
        }

        let snapshot = {
            let mut state = self.inner.state.write().await;
            if seq <= state.applied_seq {
                debug!(seq, applied = state.applied_seq, "Discarding stale cart response");
                return Ok(state.items.clone());
            }
            state.applied_seq = seq;
            state.totals = CartTotals::compute(&items, self.inner.settings.delivery_fee);
            state.items = items;
            CartSnapshot {
                items: state.items.clone(),
                totals: state.totals,
            }
        };

        debug!(
            lines = snapshot.totals.line_count,
            items = snapshot.totals.item_count,
            "Cart loaded"
        );
        let items = snapshot.items.clone();
        self.emit(CartEvent::Updated(snapshot));
        Ok(items)
    }

    /// Set the quantity of a line item.
    ///
    /// Cancels a pending debounced change for the same item.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a quantity outside 1..=10; nothing is sent.
    /// - `NotFound` if the item is not in the local cart; nothing is sent.
    /// - `Unauthenticated`, `RemoteRejected` or `Network` from the update or
    ///   the reload that follows it.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
        color: &str,
        size: &str,
    ) -> Result<()> {
        let quantity = Quantity::new(quantity)?;
        let key = LineItemKey::new(product_id, color, size);

        if self
            .inner
            .debouncer
            .pending_tag()
            .is_some_and(|change| change.key == key)
        {
            self.inner.debouncer.cancel();
        }

        self.update_quantity(&key, quantity).await
    }

    /// Schedule one more unit of a line item.
    ///
    /// Repeated calls inside the debounce window build on each other and
    /// reach the server as a single update carrying the final quantity. Any
    /// other pending quantity change, for this or another item, is replaced.
    /// At 10 units this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the item is not in the local cart. Failures of
    /// the delayed update are emitted as [`CartEvent::Error`].
    pub async fn increase_quantity(&self, product_id: ProductId, color: &str, size: &str) -> Result<()> {
        self.step_quantity(LineItemKey::new(product_id, color, size), Step::Up)
            .await
    }

    /// Schedule one fewer unit of a line item. At 1 unit this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the item is not in the local cart.
    pub async fn decrease_quantity(&self, product_id: ProductId, color: &str, size: &str) -> Result<()> {
        self.step_quantity(LineItemKey::new(product_id, color, size), Step::Down)
            .await
    }

    /// Send a pending quantity change now and wait until every scheduled
    /// change has completed.
    pub async fn flush(&self) {
        self.inner.debouncer.flush().await;
    }

    /// Remove a line item.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the item is not in the local cart; nothing is sent.
    /// - `Unauthenticated`, `RemoteRejected` or `Network` from the removal or
    ///   the reload that follows it.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: ProductId, color: &str, size: &str) -> Result<()> {
        let key = LineItemKey::new(product_id, color, size);
        if self.find(&key).await.is_none() {
            return Err(CartError::NotFound(key));
        }

        if self
            .inner
            .debouncer
            .pending_tag()
            .is_some_and(|change| change.key == key)
        {
            self.inner.debouncer.cancel();
        }

        let token = self.require_token().await?;

        let product = product_id.to_string();
        add_breadcrumb(
            "cart",
            "Removing line item",
            Some(&[("product_id", product.as_str()), ("color", color), ("size", size)]),
        );

        self.inner
            .api
            .remove_cart_item(&token, product_id, &selector(&key))
            .await
            .map_err(|e| self.remote_failure("remove_item", e))?;

        if !self.image_shared_by_other_line(&key).await {
            self.forget_image(&key.image_key()).await;
        }

        self.load_all().await?;
        Ok(())
    }

    /// Drop all local state, e.g. after logout. The server cart is untouched.
    pub async fn reset(&self) {
        self.inner.debouncer.cancel();
        self.clear_local().await;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn step_quantity(&self, key: LineItemKey, step: Step) -> Result<()> {
        let current = match self.inner.debouncer.pending_tag() {
            Some(change) if change.key == key => change.target,
            _ => self
                .find(&key)
                .await
                .map(|item| item.quantity)
                .ok_or_else(|| CartError::NotFound(key.clone()))?,
        };

        let target = match step {
            Step::Up => current.increment(),
            Step::Down => current.decrement(),
        };
        let Some(target) = target else {
            debug!(key = %key, quantity = %current, "Quantity already at bound");
            return Ok(());
        };

        debug!(key = %key, from = %current, to = %target, "Scheduling quantity change");

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let change = QuantityChange {
            key: key.clone(),
            target,
        };
        self.inner.debouncer.schedule(change, async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let session = CartSession { inner };
            if let Err(err) = session.update_quantity(&key, target).await {
                warn!(key = %key, error = %err, "Debounced quantity update failed");
                session.emit(CartEvent::Error(err.to_string()));
            }
        });
        Ok(())
    }

    async fn update_quantity(&self, key: &LineItemKey, quantity: Quantity) -> Result<()> {
        if self.find(key).await.is_none() {
            return Err(CartError::NotFound(key.clone()));
        }

        let token = self.require_token().await?;

        let product = key.product_id.to_string();
        let amount = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Updating line item quantity",
            Some(&[("product_id", product.as_str()), ("quantity", amount.as_str())]),
        );

        let request = CartLineRequest {
            quantity: quantity.get(),
            color: key.color.clone(),
            size: key.size.clone(),
        };
        self.inner
            .api
            .update_cart_item(&token, key.product_id, &request)
            .await
            .map_err(|e| self.remote_failure("set_quantity", e))?;

        self.load_all().await?;
        Ok(())
    }

    /// Bearer token, or `Unauthenticated` after asking the view to log in.
    pub(super) async fn require_token(&self) -> Result<SecretString> {
        if let Some(token) = self.inner.credentials.token().await? {
            return Ok(token);
        }
        debug!("No bearer token stored");
        self.emit(CartEvent::RedirectToLogin);
        Err(CartError::Unauthenticated)
    }

    /// Convert an API failure, redirecting to login on 401 and reporting
    /// remote failures.
    pub(super) fn remote_failure(&self, operation: &str, err: ApiError) -> CartError {
        let err = CartError::from(err);
        if err.requires_login() {
            self.emit(CartEvent::RedirectToLogin);
        }
        capture_cart_error(operation, &err);
        err
    }

    pub(super) fn emit(&self, event: CartEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn next_seq(&self) -> u64 {
        self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Empty local state and fence off fetches started before now.
    pub(super) async fn clear_local(&self) {
        let fence = self.next_seq();
        let snapshot = {
            let mut state = self.inner.state.write().await;
            state.items.clear();
            state.totals = CartTotals::empty(self.inner.settings.delivery_fee);
            state.applied_seq = fence;
            CartSnapshot {
                items: Vec::new(),
                totals: state.totals,
            }
        };
        self.emit(CartEvent::Updated(snapshot));
    }

    pub(super) fn cancel_pending_changes(&self) {
        self.inner.debouncer.cancel();
    }

    async fn image_shared_by_other_line(&self, key: &LineItemKey) -> bool {
        self.inner
            .state
            .read()
            .await
            .items
            .iter()
            .any(|item| {
                item.product_id == key.product_id && item.color == key.color && item.size != key.size
            })
    }

    async fn remember_image(&self, key: &ImageKey, url: &str) {
        if let Err(err) = self.inner.images.remember(key, url).await {
            warn!(product_id = %key.product_id, color = %key.color, error = %err, "Failed to remember cart image");
        }
    }

    async fn lookup_image(&self, key: &ImageKey) -> Option<String> {
        match self.inner.images.lookup(key).await {
            Ok(url) => url,
            Err(err) => {
                warn!(product_id = %key.product_id, color = %key.color, error = %err, "Failed to read cart image");
                None
            }
        }
    }

    pub(super) async fn forget_image(&self, key: &ImageKey) {
        if let Err(err) = self.inner.images.forget(key).await {
            warn!(product_id = %key.product_id, color = %key.color, error = %err, "Failed to forget cart image");
        }
    }
}

pub(super) fn selector(key: &LineItemKey) -> CartLineSelector {
    CartLineSelector {
        color: key.color.clone(),
        size: key.size.clone(),
    }
}

fn non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CartError::ValidationFailed(format!("{field} must not be empty")));
    }
    Ok(value)
}
