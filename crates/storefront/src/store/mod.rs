//! Client-local key-value persistence.
//!
//! Two tiers back the storefront client:
//!
//! - a short-lived **session tier** holding the bearer token (cookie
//!   semantics: entries carry an expiry and read as absent once it passes)
//! - a **durable tier** holding the display avatar and the cart image
//!   side-table
//!
//! Both tiers are [`KeyValueStore`]s. [`MemoryStore`] keeps entries in
//! process; [`FileStore`] persists them as a JSON map.

mod credentials;
mod file;
mod images;

pub use credentials::CredentialStore;
pub use file::FileStore;
pub use images::ImageRefTable;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from a key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a valid store.
    #[error("corrupt store: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Abstraction over client-local storage backends.
///
/// Expired entries behave exactly like missing ones.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves a value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores a value, replacing any previous one.
    async fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Removes a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Lists all live keys in sorted order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// A stored value and its optional expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    pub(crate) fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Utc::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.entries.lock().await.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let now = Utc::now();
        let entries = self.entries.lock().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
