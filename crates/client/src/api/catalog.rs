//! Posts API client backing the catalog.
//!
//! Raw records are cached with `moka` for the configured TTL; a zero TTL
//! disables caching entirely.

use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, instrument};

use itemdeck_core::{ItemId, RawRecord};

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, CatalogApi, RequestClient};
use crate::config::ApiConfig;

/// Records cached at most.
const CACHE_CAPACITY: u64 = 1000;

/// [`CatalogApi`] over the remote posts endpoints.
#[derive(Clone)]
pub struct HttpCatalogApi {
    inner: Arc<HttpCatalogApiInner>,
}

struct HttpCatalogApiInner {
    client: RequestClient,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl HttpCatalogApi {
    /// Create a catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = RequestClient::new(config)?;

        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(HttpCatalogApiInner { client, cache }),
        })
    }

    async fn cached(&self, key: CacheKey) -> Option<CacheValue> {
        match &self.inner.cache {
            Some(cache) => cache.get(&key).await,
            None => None,
        }
    }

    async fn store(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    /// Invalidate all cached records.
    pub async fn invalidate_all(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
        }
    }
}

impl CatalogApi for HttpCatalogApi {
    #[instrument(skip(self))]
    async fn list_records(&self) -> Result<Vec<RawRecord>, ApiError> {
        if let Some(CacheValue::Records(records)) = self.cached(CacheKey::Records).await {
            debug!(count = records.len(), "Cache hit for records");
            return Ok(records);
        }

        let records: Vec<RawRecord> = self.inner.client.get_json("/posts").await?;
        debug!(count = records.len(), "Fetched records");

        self.store(CacheKey::Records, CacheValue::Records(records.clone()))
            .await;
        Ok(records)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_record(&self, id: ItemId) -> Result<RawRecord, ApiError> {
        if let Some(CacheValue::Record(record)) = self.cached(CacheKey::Record(id)).await {
            debug!("Cache hit for record");
            return Ok(record);
        }

        let record: RawRecord = self.inner.client.get_json(&format!("/posts/{id}")).await?;

        self.store(CacheKey::Record(id), CacheValue::Record(record.clone()))
            .await;
        Ok(record)
    }
}
