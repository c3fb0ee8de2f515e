//! JSON file backed store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{KeyValueStore, StoreError, StoredEntry};

type Entries = BTreeMap<String, StoredEntry>;

/// Store persisted as a single JSON object on disk.
///
/// Every write rewrites the file through a temporary sibling and a rename, so
/// a crash never leaves a half-written store behind. Expired entries are
/// dropped on the next write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Entries, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Entries::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), entries = entries.len(), "Store written");
        Ok(())
    }

    async fn update(&self, apply: impl FnOnce(&mut Entries) + Send) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let now = Utc::now();
        entries.retain(|_, entry| entry.is_live(now));
        apply(&mut entries);
        self.save(&entries).await
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
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
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at,
        };
        self.update(|entries| {
            entries.insert(key.to_string(), entry);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let now = Utc::now();
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key)
            .collect())
    }
}
