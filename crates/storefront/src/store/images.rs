//! Image reference side-table.
//!
//! The cart listing does not reliably echo the image the user saw when adding
//! an item, so the client remembers it per `(product, color)` under
//! `cartImage_{productId}_{color}` in the durable tier.

use std::sync::Arc;

use redseam_core::ImageKey;

use super::{KeyValueStore, StoreError};

const KEY_PREFIX: &str = "cartImage_";

/// Maps `(product, color)` to the last display image URL seen for it.
#[derive(Clone)]
pub struct ImageRefTable {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for ImageRefTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRefTable").finish_non_exhaustive()
    }
}

impl ImageRefTable {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Storage key of an entry.
    #[must_use]
    pub fn storage_key(key: &ImageKey) -> String {
        format!("{KEY_PREFIX}{}_{}", key.product_id, key.color)
    }

    /// Record the image shown for `key`. Blank URLs are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable tier cannot be written.
    pub async fn remember(&self, key: &ImageKey, url: &str) -> Result<(), StoreError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(());
        }
        self.store.set(&Self::storage_key(key), url, None).await
    }

    /// Image last recorded for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable tier cannot be read.
    pub async fn lookup(&self, key: &ImageKey) -> Result<Option<String>, StoreError> {
        self.store.get(&Self::storage_key(key)).await
    }

    /// Erase the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable tier cannot be written.
    pub async fn forget(&self, key: &ImageKey) -> Result<(), StoreError> {
        self.store.remove(&Self::storage_key(key)).await
    }

    /// Number of remembered images.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable tier cannot be read.
    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self
            .store
            .keys()
            .await?
            .iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .count())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redseam_core::ProductId;

    use super::*;
    use crate::store::MemoryStore;

    fn key(id: i32, color: &str) -> ImageKey {
        ImageKey {
            product_id: ProductId::new(id),
            color: color.to_string(),
        }
    }

    #[test]
    fn test_storage_key_format() {
        assert_eq!(ImageRefTable::storage_key(&key(4, "Blue")), "cartImage_4_Blue");
    }

    #[tokio::test]
    async fn test_remember_lookup_forget() {
        let durable = Arc::new(MemoryStore::new());
        let table = ImageRefTable::new(durable.clone());

        table.remember(&key(4, "Blue"), "https://cdn/4-blue.png").await.unwrap();
        table.remember(&key(4, "Red"), "https://cdn/4-red.png").await.unwrap();
        durable.set("userAvatar", "https://cdn/me.png", None).await.unwrap();

        assert_eq!(
            table.lookup(&key(4, "Blue")).await.unwrap().as_deref(),
            Some("https://cdn/4-blue.png")
        );
        assert_eq!(table.count().await.unwrap(), 2);

        table.forget(&key(4, "Blue")).await.unwrap();
        assert_eq!(table.lookup(&key(4, "Blue")).await.unwrap(), None);
        assert_eq!(table.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blank_url_is_not_recorded() {
        let table = ImageRefTable::new(Arc::new(MemoryStore::new()));
        table.remember(&key(1, "Black"), "  ").await.unwrap();
        assert_eq!(table.lookup(&key(1, "Black")).await.unwrap(), None);
    }
}
