//! Bearer token and display avatar storage.

use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use super::{KeyValueStore, StoreError};

/// Session tier key of the bearer token.
pub const TOKEN_KEY: &str = "authToken";

/// Durable tier key of the display avatar URL.
pub const AVATAR_KEY: &str = "userAvatar";

/// Holds the bearer token (session tier) and the avatar URL (durable tier).
#[derive(Clone)]
pub struct CredentialStore {
    session: Arc<dyn KeyValueStore>,
    durable: Arc<dyn KeyValueStore>,
    token_ttl: Duration,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    #[must_use]
    pub fn new(
        session: Arc<dyn KeyValueStore>,
        durable: Arc<dyn KeyValueStore>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            session,
            durable,
            token_ttl,
        }
    }

    /// Durable tier, shared with the cart image side-table.
    #[must_use]
    pub fn durable(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.durable)
    }

    /// Current bearer token, if one is stored and not expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the session tier cannot be read.
    pub async fn token(&self) -> Result<Option<SecretString>, StoreError> {
        Ok(self
            .session
            .get(TOKEN_KEY)
            .await?
            .filter(|token| !token.trim().is_empty())
            .map(SecretString::from))
    }

    /// Store a fresh bearer token, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the session tier cannot be written.
    #[instrument(skip_all)]
    pub async fn set_token(&self, token: &SecretString) -> Result<(), StoreError> {
        // A lifetime past the end of the calendar stores a token that never expires.
        let expires_at = Utc::now().checked_add_signed(self.token_ttl);
        self.session
            .set(TOKEN_KEY, token.expose_secret(), expires_at)
            .await?;
        debug!(?expires_at, "Bearer token stored");
        Ok(())
    }

    /// Forget the bearer token (logout).
    ///
    /// # Errors
    ///
    /// Returns an error if the session tier cannot be written.
    pub async fn clear_token(&self) -> Result<(), StoreError> {
        self.session.remove(TOKEN_KEY).await
    }

    /// Display avatar URL or data URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable tier cannot be read.
    pub async fn avatar(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .durable
            .get(AVATAR_KEY)
            .await?
            .filter(|value| is_displayable_avatar(value)))
    }

    /// Remember the display avatar. Returns `false` and stores nothing when
    /// the value is neither an `http(s)` URL nor an image data URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable tier cannot be written.
    pub async fn set_avatar(&self, value: &str) -> Result<bool, StoreError> {
        let value = value.trim();
        if !is_displayable_avatar(value) {
            debug!("Ignoring avatar that is not a URL or image data URI");
            return Ok(false);
        }
        self.durable.set(AVATAR_KEY, value, None).await?;
        Ok(true)
    }

    /// Forget the display avatar.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable tier cannot be written.
    pub async fn clear_avatar(&self) -> Result<(), StoreError> {
        self.durable.remove(AVATAR_KEY).await
    }
}

fn is_displayable_avatar(value: &str) -> bool {
    value.starts_with("http") || value.starts_with("data:image")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store_with_ttl(ttl: Duration) -> (CredentialStore, Arc<MemoryStore>) {
        let session = Arc::new(MemoryStore::new());
        let durable = Arc::new(MemoryStore::new());
        (
            CredentialStore::new(session.clone(), durable, ttl),
            session,
        )
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let (store, _) = store_with_ttl(Duration::hours(24));
        assert!(store.token().await.unwrap().is_none());

        store
            .set_token(&SecretString::from("abc"))
            .await
            .unwrap();
        assert_eq!(store.token().await.unwrap().unwrap().expose_secret(), "abc");

        store.clear_token().await.unwrap();
        assert!(store.token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_reads_absent() {
        let (store, _) = store_with_ttl(Duration::seconds(-1));
        store
            .set_token(&SecretString::from("abc"))
            .await
            .unwrap();
        assert!(store.token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let (store, _) = store_with_ttl(Duration::MAX);
        store
            .set_token(&SecretString::from("abc"))
            .await
            .unwrap();
        assert_eq!(store.token().await.unwrap().unwrap().expose_secret(), "abc");
    }

    #[tokio::test]
    async fn test_blank_token_reads_absent() {
        let (store, session) = store_with_ttl(Duration::hours(1));
        session.set(TOKEN_KEY, "  ", None).await.unwrap();
        assert!(store.token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_avatar_accepts_only_urls_and_data_uris() {
        let (store, _) = store_with_ttl(Duration::hours(1));

        assert!(!store.set_avatar("avatar.png").await.unwrap());
        assert!(store.avatar().await.unwrap().is_none());

        assert!(store.set_avatar("https://cdn/a.png").await.unwrap());
        assert_eq!(
            store.avatar().await.unwrap().as_deref(),
            Some("https://cdn/a.png")
        );

        assert!(store.set_avatar("data:image/png;base64,AAAA").await.unwrap());
        store.clear_avatar().await.unwrap();
        assert!(store.avatar().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_keeps_avatar_tier_separate() {
        let (store, _) = store_with_ttl(Duration::hours(1));
        store
            .set_token(&SecretString::from("abc"))
            .await
            .unwrap();
        store.set_avatar("https://cdn/a.png").await.unwrap();

        store.clear_token().await.unwrap();
        assert!(store.token().await.unwrap().is_none());
        assert!(store.avatar().await.unwrap().is_some());
    }
}
