//! In-memory storage.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{KeyValueStore, StorageError};

/// Process-local [`KeyValueStore`]. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty().await);

        storage.set("user", "{}").await.unwrap();
        assert_eq!(storage.get("user").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.len().await, 1);

        storage.remove("user").await.unwrap();
        assert_eq!(storage.get("user").await.unwrap(), None);
        storage.remove("user").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.set("authToken", "t").await.unwrap();
        assert_eq!(b.get("authToken").await.unwrap().as_deref(), Some("t"));
    }
}
