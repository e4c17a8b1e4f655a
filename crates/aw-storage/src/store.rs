//! Key-value store abstraction for testability
//!
//! Provides a trait-based interface over the host's durable string store,
//! with a file-backed implementation for hosts without a platform
//! preferences bridge and an in-memory implementation for tests and
//! ephemeral use.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use aw_types::{AppError, AppResult};

/// Trait for durable key-value operations
///
/// Implementations are expected to be reliable and asynchronous; keys and
/// values are opaque strings.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value by key
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store a key-value pair, overwriting any existing value
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key-value pair; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// In-memory key-value store
///
/// Cheap to clone (clones share the same map). Used in tests and by hosts
/// that do not need verification results to survive a restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// File-backed key-value store
///
/// Persists a flat string map as JSON at the given path. The whole map is
/// kept in memory and rewritten on every mutation; the stored values here
/// are two small records, not a general-purpose database.
pub struct FileStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory view of the file contents
    cache: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Create a store backed by the given file, loading existing entries
    ///
    /// # Arguments
    /// * `path` - Path to the JSON file; created on first write
    pub async fn new(path: PathBuf) -> AppResult<Self> {
        let store = Self {
            path,
            cache: RwLock::new(HashMap::new()),
        };

        store.load().await?;

        Ok(store)
    }

    /// Load entries from disk
    async fn load(&self) -> AppResult<()> {
        if !self.path.exists() {
            trace!("FileStore: no file at {}, starting empty", self.path.display());
            return Ok(());
        }

        let contents = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read store file: {}", e)))?;

        // An empty file is treated as an empty map
        let entries: HashMap<String, String> = if contents.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&contents)
                .map_err(|e| AppError::Storage(format!("Failed to parse store file: {}", e)))?
        };

        let mut cache = self.cache.write().await;
        *cache = entries;
        debug!(
            "FileStore: loaded {} entries from {}",
            cache.len(),
            self.path.display()
        );

        Ok(())
    }

    /// Save entries to disk
    async fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create store directory: {}", e)))?;
        }

        let cache = self.cache.read().await;
        let contents = serde_json::to_string_pretty(&*cache)
            .map_err(|e| AppError::Storage(format!("Failed to serialize store: {}", e)))?;

        fs::write(&self.path, contents)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write store file: {}", e)))?;

        // The store holds a bearer token; keep the file owner-only on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to get file metadata: {}", e)))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to set file permissions: {}", e)))?;
        }

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        {
            let mut cache = self.cache.write().await;
            cache.insert(key.to_string(), value.to_string());
        }
        self.save().await?;
        trace!("FileStore: stored {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        {
            let mut cache = self.cache.write().await;
            if cache.remove(key).is_none() {
                return Ok(());
            }
        }
        self.save().await?;
        trace!("FileStore: removed {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();

        store.set("key", "value").await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));

        store.remove("key").await.unwrap();
        assert!(store.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_overwrite() {
        let store = MemoryStore::new();

        store.set("key", "old").await.unwrap();
        store.set("key", "new").await.unwrap();

        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_memory_store_remove_absent() {
        let store = MemoryStore::new();
        assert!(store.remove("missing").await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let clone = store.clone();

        store.set("key", "value").await.unwrap();
        assert_eq!(clone.get("key").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_file_store_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::new(path.clone()).await.unwrap();
        store.set("key", "value").await.unwrap();

        // A fresh instance sees the persisted entry
        let store2 = FileStore::new(path).await.unwrap();
        assert_eq!(store2.get("key").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_file_store_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::new(path.clone()).await.unwrap();
        store.set("key", "value").await.unwrap();
        store.remove("key").await.unwrap();

        let store2 = FileStore::new(path).await.unwrap();
        assert!(store2.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "").unwrap();

        let store = FileStore::new(path).await.unwrap();
        assert!(store.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dirs").join("store.json");

        let store = FileStore::new(path.clone()).await.unwrap();
        store.set("key", "value").await.unwrap();

        assert!(path.exists());
    }
}
