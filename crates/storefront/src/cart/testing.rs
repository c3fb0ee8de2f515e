//! In-memory cart server for session tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as TokenTtl;
use redseam_core::{LineItemKey, Price, ProductId};
use secrecy::SecretString;

use super::{CartApi, CartEvent, CartSession};
use crate::api::{ApiError, CartLine, CartLineRequest, CartLineSelector};
use crate::config::CartSettings;
use crate::store::{CredentialStore, ImageRefTable, MemoryStore};

/// A request the fake server received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add(ProductId, CartLineRequest),
    Get,
    Update(ProductId, CartLineRequest),
    Remove(ProductId, CartLineSelector),
}

#[derive(Default)]
struct FakeState {
    lines: Vec<CartLine>,
    calls: Vec<Call>,
    reject_token: bool,
    reject_add: bool,
    reject_update: bool,
    fail_get: bool,
    fail_remove: HashSet<LineItemKey>,
    get_delays: VecDeque<Duration>,
}

/// Cart server that merges lines by identity key like the real one.
#[derive(Default)]
pub struct FakeCartApi {
    state: Mutex<FakeState>,
}

impl FakeCartApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_line(&self, id: i32, cents: i64, quantity: u32, color: &str, size: &str) {
        self.state
            .lock()
            .unwrap()
            .lines
            .push(line(id, cents, quantity, color, size));
    }

    pub fn set_image(&self, id: i32, color: &str, url: &str) {
        let mut state = self.state.lock().unwrap();
        for line in &mut state.lines {
            if line.id == ProductId::new(id) && line.color == color {
                line.image = Some(url.to_string());
            }
        }
    }

    pub fn replace_lines(&self, lines: Vec<CartLine>) {
        self.state.lock().unwrap().lines = lines;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn updates(&self) -> Vec<(ProductId, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(id, request) => Some((id, request.quantity)),
                _ => None,
            })
            .collect()
    }

    pub fn reject_token(&self) {
        self.state.lock().unwrap().reject_token = true;
    }

    pub fn reject_add(&self) {
        self.state.lock().unwrap().reject_add = true;
    }

    pub fn reject_update(&self) {
        self.state.lock().unwrap().reject_update = true;
    }

    pub fn fail_get(&self, fail: bool) {
        self.state.lock().unwrap().fail_get = fail;
    }

    pub fn fail_remove(&self, key: LineItemKey) {
        self.state.lock().unwrap().fail_remove.insert(key);
    }

    /// Delay the next `GET /cart` response by `delay`.
    pub fn delay_next_get(&self, delay: Duration) {
        self.state.lock().unwrap().get_delays.push_back(delay);
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.reject_token {
            return Err(ApiError::Unauthenticated);
        }
        Ok(())
    }
}

pub fn line(id: i32, cents: i64, quantity: u32, color: &str, size: &str) -> CartLine {
    CartLine {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Price::from_cents(cents),
        quantity,
        color: color.to_string(),
        size: size.to_string(),
        image: None,
        cover_image: None,
        total_price: None,
    }
}

#[async_trait]
impl CartApi for FakeCartApi {
    async fn add_to_cart(
        &self,
        _token: &SecretString,
        product_id: ProductId,
        request: &CartLineRequest,
    ) -> Result<CartLine, ApiError> {
        self.record(Call::Add(product_id, request.clone()))?;
        let mut state = self.state.lock().unwrap();
        if state.reject_add {
            return Err(ApiError::Rejected {
                status: 422,
                body: r#"{"message":"The selected size is invalid."}"#.to_string(),
            });
        }

        if let Some(existing) = state.lines.iter_mut().find(|l| {
            l.id == product_id && l.color == request.color && l.size == request.size
        }) {
            existing.quantity += request.quantity;
            return Ok(existing.clone());
        }

        let created = line(
            product_id.as_i32(),
            1000,
            request.quantity,
            &request.color,
            &request.size,
        );
        state.lines.push(created.clone());
        Ok(created)
    }

    async fn get_cart(&self, _token: &SecretString) -> Result<Vec<CartLine>, ApiError> {
        self.record(Call::Get)?;
        let (lines, delay) = {
            let mut state = self.state.lock().unwrap();
            if state.fail_get {
                return Err(ApiError::Rejected {
                    status: 500,
                    body: "Server Error".to_string(),
                });
            }
            (state.lines.clone(), state.get_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(lines)
    }

    async fn update_cart_item(
        &self,
        _token: &SecretString,
        product_id: ProductId,
        request: &CartLineRequest,
    ) -> Result<(), ApiError> {
        self.record(Call::Update(product_id, request.clone()))?;
        let mut state = self.state.lock().unwrap();
        if state.reject_update {
            return Err(ApiError::Rejected {
                status: 422,
                body: r#"{"message":"Out of stock"}"#.to_string(),
            });
        }
        let line = state
            .lines
            .iter_mut()
            .find(|l| l.id == product_id && l.color == request.color && l.size == request.size)
            .ok_or_else(|| ApiError::NotFound("line item".to_string()))?;
        line.quantity = request.quantity;
        Ok(())
    }

    async fn remove_cart_item(
        &self,
        _token: &SecretString,
        product_id: ProductId,
        selector: &CartLineSelector,
    ) -> Result<(), ApiError> {
        self.record(Call::Remove(product_id, selector.clone()))?;
        let mut state = self.state.lock().unwrap();
        let key = LineItemKey::new(product_id, selector.color.clone(), selector.size.clone());
        if state.fail_remove.contains(&key) {
            return Err(ApiError::Rejected {
                status: 500,
                body: "removal failed".to_string(),
            });
        }
        state
            .lines
            .retain(|l| !(l.id == product_id && l.color == selector.color && l.size == selector.size));
        Ok(())
    }
}

/// A session wired to `api` with in-memory storage.
pub struct Harness {
    pub session: CartSession,
    pub credentials: CredentialStore,
    pub images: ImageRefTable,
}

impl Harness {
    pub async fn logged_in(api: &Arc<FakeCartApi>) -> Self {
        Self::logged_in_with(api, CartSettings::default()).await
    }

    pub async fn logged_in_with(api: &Arc<FakeCartApi>, settings: CartSettings) -> Self {
        let harness = Self::logged_out_with(api, settings);
        harness
            .credentials
            .set_token(&SecretString::from("test-token"))
            .await
            .unwrap();
        harness
    }

    pub fn logged_out(api: &Arc<FakeCartApi>) -> Self {
        Self::logged_out_with(api, CartSettings::default())
    }

    fn logged_out_with(api: &Arc<FakeCartApi>, settings: CartSettings) -> Self {
        let credentials = CredentialStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            TokenTtl::hours(1),
        );
        let images = ImageRefTable::new(credentials.durable());
        let session = CartSession::new(api.clone(), credentials.clone(), settings);
        Self {
            session,
            credentials,
            images,
        }
    }
}

/// Every event received so far.
pub fn drain(events: &mut tokio::sync::broadcast::Receiver<CartEvent>) -> Vec<CartEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}
