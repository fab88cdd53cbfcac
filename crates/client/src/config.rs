//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `ITEMDECK_API_BASE_URL` - Posts API base URL (default: `https://jsonplaceholder.typicode.com`)
//! - `ITEMDECK_API_TIMEOUT_MS` - Per-request timeout (default: 10000)
//! - `ITEMDECK_API_RETRIES` - Retries for retryable failures (default: 0)
//! - `ITEMDECK_API_RETRY_DELAY_MS` - Base retry delay, doubled per attempt (default: 1000)
//! - `ITEMDECK_CACHE_TTL_SECS` - Raw record cache lifetime, 0 disables (default: 300)
//! - `ITEMDECK_IMAGE_BASE_URL` - Image service base URL (default: `https://picsum.photos`)
//! - `ITEMDECK_ITEMS_LIMIT` - Items per list page (default: 20)
//! - `ITEMDECK_TRANSFORM_SEED` - Seed for generated prices and ratings (default: 0)
//! - `ITEMDECK_MOCK_LATENCY_MS` - Simulated auth service latency (default: 0)
//! - `ITEMDECK_STORAGE_PATH` - Session storage file (default: `.itemdeck/storage.json`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
const DEFAULT_IMAGE_BASE_URL: &str = "https://picsum.photos";
const DEFAULT_STORAGE_PATH: &str = ".itemdeck/storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote API settings.
    pub api: ApiConfig,
    /// Item transform settings.
    pub catalog: CatalogConfig,
    /// Simulated latency of the mock auth service.
    pub mock_latency: Duration,
    /// File backing the persisted session.
    pub storage_path: PathBuf,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
    /// Sentry environment name.
    pub sentry_environment: Option<String>,
}

/// Remote API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL the posts endpoints are appended to.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for retryable failures (0 disables retrying).
    pub retries: u32,
    /// Delay before the first retry; doubled for each later attempt.
    pub retry_delay: Duration,
    /// Lifetime of cached raw records (zero disables the cache).
    pub cache_ttl: Duration,
}

/// Item transform configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the image service.
    pub image_base_url: Url,
    /// Items kept from a list response.
    pub items_limit: usize,
    /// Seed mixed into every record's price/rating generator.
    pub transform_seed: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            catalog: CatalogConfig::default(),
            mock_latency: Duration::ZERO,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

#[allow(clippy::expect_used)]
impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default API URL is valid"),
            timeout: Duration::from_secs(10),
            retries: 0,
            retry_delay: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[allow(clippy::expect_used)]
impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            image_base_url: Url::parse(DEFAULT_IMAGE_BASE_URL).expect("default image URL is valid"),
            items_limit: 20,
            transform_seed: 0,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api = ApiConfig {
            base_url: parse_url(&lookup, "ITEMDECK_API_BASE_URL", defaults.api.base_url)?,
            timeout: parse_millis(&lookup, "ITEMDECK_API_TIMEOUT_MS", defaults.api.timeout)?,
            retries: parse_or(&lookup, "ITEMDECK_API_RETRIES", defaults.api.retries)?,
            retry_delay: parse_millis(
                &lookup,
                "ITEMDECK_API_RETRY_DELAY_MS",
                defaults.api.retry_delay,
            )?,
            cache_ttl: parse_or(
                &lookup,
                "ITEMDECK_CACHE_TTL_SECS",
                defaults.api.cache_ttl.as_secs(),
            )
            .map(Duration::from_secs)?,
        };

        let catalog = CatalogConfig {
            image_base_url: parse_url(
                &lookup,
                "ITEMDECK_IMAGE_BASE_URL",
                defaults.catalog.image_base_url,
            )?,
            items_limit: parse_or(&lookup, "ITEMDECK_ITEMS_LIMIT", defaults.catalog.items_limit)?,
            transform_seed: parse_or(
                &lookup,
                "ITEMDECK_TRANSFORM_SEED",
                defaults.catalog.transform_seed,
            )?,
        };

        if catalog.items_limit == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ITEMDECK_ITEMS_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api,
            catalog,
            mock_latency: parse_millis(&lookup, "ITEMDECK_MOCK_LATENCY_MS", defaults.mock_latency)?,
            storage_path: lookup("ITEMDECK_STORAGE_PATH")
                .map_or(defaults.storage_path, PathBuf::from),
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable with `FromStr`, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a millisecond count into a `Duration`.
fn parse_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse an absolute http(s) URL.
fn parse_url(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Url,
) -> Result<Url, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
