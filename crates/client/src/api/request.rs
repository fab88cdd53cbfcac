//! HTTP request layer shared by the remote services.
//!
//! One `reqwest::Client` per [`RequestClient`], configured with the API
//! timeout and JSON headers. Every call gets a request id, is logged on the
//! way out and back, and fails with a classified [`ApiError`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::{ApiError, ApiErrorKind};
use crate::config::ApiConfig;

/// Header carrying the per-request id.
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Longest body excerpt kept in logs and error messages.
const BODY_EXCERPT_CHARS: usize = 200;

/// Exponential-backoff retry policy.
///
/// Attempt `n` (0-based) waits `base_delay * 2^n`. Only retryable failures
/// (network, timeout, 5xx) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    /// Whether a failure on attempt `attempt` should be retried.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32, error: &ApiError) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Delay before retrying after attempt `attempt` failed.
    #[must_use]
    pub const fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

impl From<&ApiConfig> for RetryPolicy {
    fn from(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.retries,
            base_delay: config.retry_delay,
        }
    }
}

/// JSON-over-HTTP client for the posts API.
#[derive(Clone)]
pub struct RequestClient {
    inner: Arc<RequestClientInner>,
}

struct RequestClientInner {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RequestClient {
    /// Build a client from API configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed
    /// (e.g. TLS backend initialization fails).
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::new(ApiErrorKind::Unknown, e.to_string()))?;

        Ok(Self {
            inner: Arc::new(RequestClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                retry: RetryPolicy::from(config),
            }),
        })
    }

    /// The base URL paths are appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// GET `path` and decode the JSON body, retrying per the retry policy.
    ///
    /// # Errors
    ///
    /// Returns the classified error of the last attempt.
    #[instrument(skip(self), fields(request_id))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request_id = generate_request_id();
        tracing::Span::current().record("request_id", request_id.as_str());

        let retry = self.inner.retry;
        let mut attempt = 0;
        loop {
            match self.send_once(path, &request_id).await {
                Ok(value) => return Ok(value),
                Err(e) if retry.should_retry(attempt, &e) => {
                    let delay = retry.delay_for(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        path: &str,
        request_id: &str,
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.inner.base_url);
        debug!(method = "GET", url = %url, "API request");

        let response = self
            .inner
            .client
            .get(&url)
            .header(REQUEST_ID_HEADER, request_id)
            .send()
            .await
            .map_err(|e| {
                let err = from_reqwest(&e).with_request_id(request_id);
                error!(url = %url, error = %e, kind = ?err.kind, "API request failed");
                err
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| from_reqwest(&e).with_request_id(request_id))?;

        if !status.is_success() {
            let err = from_status(status, &body).with_request_id(request_id);
            log_status_error(status, &url, &err);
            return Err(err);
        }

        debug!(status = %status, url = %url, bytes = body.len(), "API response");

        serde_json::from_slice(&body).map_err(|e| {
            error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to decode API response"
            );
            ApiError::new(ApiErrorKind::Decode, e.to_string()).with_request_id(request_id)
        })
    }
}

/// Generate a unique request id.
fn generate_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

/// Classify a transport-level failure.
fn from_reqwest(err: &reqwest::Error) -> ApiError {
    let kind = if err.is_timeout() {
        ApiErrorKind::Timeout
    } else if let Some(status) = err.status() {
        kind_for_status(status)
    } else if err.is_decode() || err.is_body() {
        ApiErrorKind::Decode
    } else if err.is_connect() || err.is_request() {
        ApiErrorKind::Network
    } else {
        ApiErrorKind::Unknown
    };
    ApiError::new(kind, err.to_string())
}

/// Classify a non-success response, preferring the server's own message.
fn from_status(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"].iter().find_map(|field| {
                value
                    .get(*field)
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| format!("HTTP {status}"));

    ApiError::new(kind_for_status(status), message)
}

fn kind_for_status(status: StatusCode) -> ApiErrorKind {
    match status.as_u16() {
        code @ 500..=599 => ApiErrorKind::Server(code),
        code @ 400..=499 => ApiErrorKind::Client(code),
        _ => ApiErrorKind::Unknown,
    }
}

fn log_status_error(status: StatusCode, url: &str, err: &ApiError) {
    match status.as_u16() {
        401 => warn!(url, "Unauthorized access - token may be expired"),
        403 => warn!(url, "Access forbidden"),
        404 => warn!(url, "Resource not found"),
        500..=599 => error!(url, status = %status, message = %err, "Server error"),
        _ => error!(url, status = %status, message = %err, "HTTP error"),
    }
}

fn excerpt(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_EXCERPT_CHARS)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_should_retry_respects_limit_and_kind() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::ZERO,
        };
        let transient = ApiError::new(ApiErrorKind::Server(502), "bad gateway");
        let permanent = ApiError::new(ApiErrorKind::Client(404), "missing");

        assert!(policy.should_retry(0, &transient));
        assert!(policy.should_retry(1, &transient));
        assert!(!policy.should_retry(2, &transient));
        assert!(!policy.should_retry(0, &permanent));
        assert!(!RetryPolicy::NONE.should_retry(0, &transient));
    }

    #[test]
    fn test_from_status_prefers_server_message() {
        let err = from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"message":"database down"}"#,
        );
        assert_eq!(err.kind, ApiErrorKind::Server(500));
        assert_eq!(err.message, "database down");

        let err = from_status(StatusCode::BAD_REQUEST, br#"{"error":"bad id"}"#);
        assert_eq!(err.kind, ApiErrorKind::Client(400));
        assert_eq!(err.message, "bad id");
    }

    #[test]
    fn test_from_status_without_json_body() {
        let err = from_status(StatusCode::NOT_FOUND, b"<html>nope</html>");
        assert_eq!(err.kind, ApiErrorKind::Client(404));
        assert_eq!(err.message, "HTTP 404 Not Found");
    }

    #[test]
    fn test_kind_for_status_classes() {
        assert_eq!(
            kind_for_status(StatusCode::SERVICE_UNAVAILABLE),
            ApiErrorKind::Server(503)
        );
        assert_eq!(kind_for_status(StatusCode::FORBIDDEN), ApiErrorKind::Client(403));
        assert_eq!(
            kind_for_status(StatusCode::PERMANENT_REDIRECT),
            ApiErrorKind::Unknown
        );
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert!(a.starts_with("req_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = ApiConfig {
            base_url: url::Url::parse("http://127.0.0.1:9/api/").unwrap(),
            ..ApiConfig::default()
        };
        let client = RequestClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9/api");
    }
}
