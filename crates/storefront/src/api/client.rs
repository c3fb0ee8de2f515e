//! RedSeam REST API client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Caches product listings and product detail
//! using `moka` (5-minute TTL). Cart calls are never cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use redseam_core::ProductId;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::ApiError;
use super::cache::CacheValue;
use super::types::{
    AuthResponse, CartLine, CartLineRequest, CartLineSelector, LoginRequest, Product,
    ProductPage, ProductQuery, RegisterRequest,
};
use crate::cart::CartApi;
use crate::config::ApiConfig;

/// Maximum number of response body characters written to the log.
const LOG_BODY_CHARS: usize = 500;

// =============================================================================
// RedseamClient
// =============================================================================

/// Client for the RedSeam REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and the catalogue
/// cache.
#[derive(Clone)]
pub struct RedseamClient {
    inner: Arc<RedseamClientInner>,
}

struct RedseamClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl RedseamClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(RedseamClientInner {
                client: builder.build()?,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
    }

    fn authorized(&self, method: Method, path: &str, token: &SecretString) -> RequestBuilder {
        self.request(method, &self.endpoint(path))
            .bearer_auth(token.expose_secret())
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "RedSeam API returned server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "RedSeam API rejected request"
            );
        }

        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthenticated,
            StatusCode::NOT_FOUND => ApiError::NotFound(body),
            _ => ApiError::Rejected {
                status: status.as_u16(),
                body,
            },
        })
    }

    // =========================================================================
    // Catalogue Methods
    // =========================================================================

    /// Get one page of the product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cache_key = query.cache_key();

        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = Url::parse(&self.endpoint("products"))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let params = query.params();
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        let body = self.execute(self.request(Method::GET, url.as_str())).await?;
        let page: ProductPage = parse_json(&body, "product listing")?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&format!("products/{id}"));
        let body = self
            .execute(self.request(Method::GET, &url))
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::NotFound(format!("Product not found: {id}")),
                other => other,
            })?;
        let product: Product = parse_json(&body, "product")?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Account Methods
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` or `Rejected` if the server refuses the
    /// credentials, or an error if the request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint("login");
        let body = self
            .execute(self.request(Method::POST, &url).json(request))
            .await?;
        parse_json(&body, "login response")
    }

    /// Create an account, optionally uploading an avatar.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the server's validation body if the account
    /// cannot be created, or an error if the request fails.
    #[instrument(
        skip(self, request),
        fields(email = %request.email, username = %request.username, avatar = request.avatar.is_some())
    )]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthResponse, ApiError> {
        let mut form = Form::new()
            .text("email", request.email.to_string())
            .text("username", request.username.to_string())
            .text("password", request.password.to_string())
            .text(
                "password_confirmation",
                request.password_confirmation.to_string(),
            );

        if let Some(avatar) = request.avatar {
            let part = Part::bytes(avatar.bytes.clone())
                .file_name(avatar.file_name.clone())
                .mime_str(&avatar.mime)
                .map_err(|e| ApiError::InvalidRequest(format!("avatar: {e}")))?;
            form = form.part("avatar", part);
        }

        let url = self.endpoint("register");
        let body = self
            .execute(self.request(Method::POST, &url).multipart(form))
            .await?;
        parse_json(&body, "registration response")
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop every cached catalogue response.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

// =============================================================================
// Cart Methods (not cached - the server owns the cart)
// =============================================================================

#[async_trait]
impl CartApi for RedseamClient {
    #[instrument(skip(self, token, line), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        token: &SecretString,
        product_id: ProductId,
        line: &CartLineRequest,
    ) -> Result<CartLine, ApiError> {
        let request = self
            .authorized(Method::POST, &format!("cart/products/{product_id}"), token)
            .json(line);
        let body = self.execute(request).await?;
        parse_json(&body, "added cart line")
    }

    #[instrument(skip(self, token))]
    async fn get_cart(&self, token: &SecretString) -> Result<Vec<CartLine>, ApiError> {
        let body = self
            .execute(self.authorized(Method::GET, "cart", token))
            .await?;
        parse_json(&body, "cart")
    }

    #[instrument(skip(self, token, line), fields(product_id = %product_id, quantity = line.quantity))]
    async fn update_cart_item(
        &self,
        token: &SecretString,
        product_id: ProductId,
        line: &CartLineRequest,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::PATCH, &format!("cart/products/{product_id}"), token)
            .json(line);
        self.execute(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token, selector), fields(product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        token: &SecretString,
        product_id: ProductId,
        selector: &CartLineSelector,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::DELETE, &format!("cart/products/{product_id}"), token)
            .json(selector);
        self.execute(request).await?;
        Ok(())
    }
}

/// Parse a response body, logging the body when it does not match.
fn parse_json<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
            "Failed to parse RedSeam {what}"
        );
        ApiError::Parse(e)
    })
}
