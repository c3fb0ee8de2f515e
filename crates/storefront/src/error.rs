//! Cart error taxonomy and Sentry helpers.
//!
//! Every cart session operation returns `Result<T, CartError>`. Lower layers
//! ([`ApiError`], [`StoreError`]) are folded into the outcomes a view
//! has to distinguish.

use redseam_core::{CustomerDetailsError, LineItemKey, QuantityError};
use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

/// Failure of a cart session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// No usable bearer token; the caller must send the user to log in.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Input rejected locally; no request was sent.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The line item is not in the local cart; no request was sent.
    #[error("Not found: {0}")]
    NotFound(LineItemKey),

    /// The server answered with a non-success status.
    #[error("Rejected by server ({status}): {payload}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the server.
        payload: String,
    },

    /// The request never produced a usable response.
    #[error("Network error: {0}")]
    Network(String),

    /// The local session or durable store could not be read or written.
    #[error("Local storage error: {0}")]
    Storage(String),
}

impl CartError {
    /// Whether the view should hand control to the login flow.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Whether this failure came from the remote side and is worth reporting.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteRejected { .. } | Self::Network(_))
    }
}

impl From<ApiError> for CartError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthenticated => Self::Unauthenticated,
            ApiError::NotFound(payload) => Self::RemoteRejected {
                status: 404,
                payload,
            },
            ApiError::Rejected { status, body } => Self::RemoteRejected {
                status,
                payload: body,
            },
            ApiError::Http(e) => Self::Network(e.to_string()),
            ApiError::Parse(e) => Self::Network(format!("malformed response: {e}")),
            ApiError::InvalidRequest(msg) => Self::ValidationFailed(msg),
        }
    }
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        Self::ValidationFailed(err.to_string())
    }
}

impl From<CustomerDetailsError> for CartError {
    fn from(err: CustomerDetailsError) -> Self {
        Self::ValidationFailed(err.to_string())
    }
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Removed line item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

/// Report a remote cart failure to Sentry and the log.
pub fn capture_cart_error(operation: &str, err: &CartError) {
    if !err.is_remote() {
        return;
    }
    let event_id = sentry::capture_error(err);
    tracing::error!(
        operation,
        error = %err,
        sentry_event_id = %event_id,
        "Cart operation failed"
    );
}

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
