//! Application state wiring the stores to their collaborators.

use std::sync::Arc;

use crate::api::{ApiError, HttpCatalogApi, MockAuthApi};
use crate::config::ClientConfig;
use crate::storage::FileStorage;
use crate::store::{CatalogStore, ItemTransform, SessionStore};

/// Session store over file storage and the mock auth service.
pub type AppSessionStore = SessionStore<FileStorage, MockAuthApi>;

/// Catalog store over the posts API.
pub type AppCatalogStore = CatalogStore<HttpCatalogApi>;

/// Application state shared by front ends.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    session: AppSessionStore,
    catalog: AppCatalogStore,
}

impl AppState {
    /// Create the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let session = SessionStore::new(
            FileStorage::new(&config.storage_path),
            MockAuthApi::new(config.mock_latency),
        );
        let catalog = CatalogStore::new(
            HttpCatalogApi::new(&config.api)?,
            ItemTransform::new(&config.catalog),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                session,
                catalog,
            }),
        })
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &AppSessionStore {
        &self.inner.session
    }

    /// Get a reference to the catalog store.
    #[must_use]
    pub fn catalog(&self) -> &AppCatalogStore {
        &self.inner.catalog
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_state_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage_path: dir.path().join("storage.json"),
            ..ClientConfig::default()
        };
        let state = AppState::new(config).unwrap();

        assert!(state.session().is_loading());
        assert!(state.session().restore_session().await.unwrap().is_none());
        assert!(state.catalog().items().is_empty());
        assert_eq!(state.catalog().snapshot().limit, 20);
        assert_eq!(state.config().catalog.items_limit, 20);
    }
}
