//! JSON file storage.
//!
//! All entries live in one JSON object. Writes go to a sibling temp file
//! that is then renamed over the previous file, so a crash never leaves a
//! half-written file behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{KeyValueStore, StorageError};

type Entries = BTreeMap<String, String>;

/// [`KeyValueStore`] persisted to a JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: Arc<PathBuf>,
    // Serializes read-modify-write cycles within this process.
    lock: Arc<Mutex<()>>,
}

impl FileStorage {
    /// Use `path` as the backing file. It is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries, StorageError> {
        match tokio::fs::read(self.path.as_path()).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Entries::new()),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes =
            serde_json::to_vec_pretty(entries).map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, self.path.as_path()).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "Storage saved");
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(&entries).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));
        assert_eq!(storage.get("user").await.unwrap(), None);
        storage.remove("user").await.unwrap();
        assert!(!storage.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::new(&path);
        storage.set("user", r#"{"id":"1"}"#).await.unwrap();
        storage.set("authToken", "mock-jwt-token-1-0").await.unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get("user").await.unwrap().as_deref(),
            Some(r#"{"id":"1"}"#)
        );
        assert_eq!(
            reopened.get("authToken").await.unwrap().as_deref(),
            Some("mock-jwt-token-1-0")
        );

        reopened.remove("authToken").await.unwrap();
        assert_eq!(storage.get("authToken").await.unwrap(), None);
        assert!(storage.get("user").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get("user").await,
            Err(StorageError::Corrupt(_))
        ));
    }
}
