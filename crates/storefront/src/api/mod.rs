//! RedSeam REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS with `reqwest`
//! - The server is the source of truth for the cart - NO local cart
//!   persistence, every mutation is followed by a fresh `GET /cart`
//! - In-memory caching via `moka` for catalogue responses (5 minute TTL)
//!
//! # Endpoints
//!
//! ## Cart (bearer token required)
//! - `POST /cart/products/{id}` - add a line item
//! - `GET /cart` - list line items
//! - `PATCH /cart/products/{id}` - change a line item's quantity
//! - `DELETE /cart/products/{id}` - remove a line item
//!
//! ## Catalogue
//! - `GET /products`, `GET /products/{id}`
//!
//! ## Accounts
//! - `POST /login`, `POST /register`
//!
//! # Example
//!
//! ```rust,ignore
//! use redseam_storefront::api::RedseamClient;
//!
//! let client = RedseamClient::new(&config.api)?;
//! let page = client.get_products(&ProductQuery::default()).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::RedseamClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the RedSeam API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server did not accept the bearer token (HTTP 401).
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server answered with another non-success status.
    #[error("API error: {status} - {body}")]
    Rejected { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The request could not be built (bad header value, bad URL, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product 7".to_string());
        assert_eq!(err.to_string(), "Not found: product 7");

        let err = ApiError::Rejected {
            status: 422,
            body: "invalid size".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 422 - invalid size");
    }
}
