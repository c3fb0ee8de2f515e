//! Command implementations.

pub mod account;
pub mod cart;
pub mod catalogue;

use std::path::PathBuf;
use std::sync::Arc;

use redseam_storefront::api::{ApiError, RedseamClient};
use redseam_storefront::cart::CartSession;
use redseam_storefront::config::StorefrontConfig;
use redseam_storefront::error::CartError;
use redseam_storefront::services::auth::AuthError;
use redseam_storefront::store::{CredentialStore, FileStore, StoreError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// A file named on the command line could not be read.
    #[error("Cannot read {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A debounced cart update failed after the command returned control.
    #[error("Cart update failed: {0}")]
    Background(String),
}

impl CliError {
    /// Whether the user has to log in before retrying.
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::Cart(e) => e.requires_login(),
            Self::Api(ApiError::Unauthenticated) => true,
            _ => false,
        }
    }
}

/// Everything a command needs, built once from the configuration.
pub struct Context {
    pub config: StorefrontConfig,
    pub client: RedseamClient,
    pub credentials: CredentialStore,
}

impl Context {
    /// Build the API client and open both storage tiers under the data
    /// directory.
    pub fn new(config: StorefrontConfig) -> Result<Self, CliError> {
        let client = RedseamClient::new(&config.api)?;
        let credentials = CredentialStore::new(
            Arc::new(FileStore::new(config.session_path())),
            Arc::new(FileStore::new(config.local_storage_path())),
            config.token_ttl,
        );
        tracing::debug!(data_dir = %config.data_dir.display(), "Storage opened");

        Ok(Self {
            config,
            client,
            credentials,
        })
    }

    /// A cart session backed by the API client.
    pub fn cart_session(&self) -> CartSession {
        CartSession::new(
            Arc::new(self.client.clone()),
            self.credentials.clone(),
            self.config.cart,
        )
    }
}
