//! Remote collaborators: the auth service and the catalog (posts) API.
//!
//! # Architecture
//!
//! - [`AuthApi`] and [`CatalogApi`] are the capabilities the stores are
//!   generic over, so tests can swap in fakes without any HTTP.
//! - [`RequestClient`] wraps `reqwest` with timeouts, request ids, logging
//!   and optional exponential-backoff retries.
//! - [`HttpCatalogApi`] fetches raw records and caches them via `moka`.
//! - [`MockAuthApi`] stands in for a real auth backend.
//!
//! Every failure is classified into an [`ApiError`] so the stores can turn it
//! into a short user-facing message.

mod auth;
mod cache;
mod catalog;
mod request;

pub use auth::{AuthError, LoginGrant, MockAuthApi, PASSWORD, SEEDED_EMAIL};
pub use catalog::HttpCatalogApi;
pub use request::{RequestClient, RetryPolicy};

use std::future::Future;

use secrecy::SecretString;
use thiserror::Error;

use itemdeck_core::{ItemId, RawRecord};

/// Credential check and sign-out.
pub trait AuthApi: Send + Sync + 'static {
    /// Validate credentials and issue a session token.
    fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<LoginGrant, AuthError>> + Send;

    /// End the remote session. Local state is the caller's responsibility.
    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Raw record source for the catalog.
pub trait CatalogApi: Send + Sync + 'static {
    /// Fetch the full record list.
    fn list_records(&self) -> impl Future<Output = Result<Vec<RawRecord>, ApiError>> + Send;

    /// Fetch a single record.
    fn get_record(&self, id: ItemId) -> impl Future<Output = Result<RawRecord, ApiError>> + Send;
}

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No response was received (DNS, connect, reset).
    Network,
    /// The request exceeded its timeout.
    Timeout,
    /// The server answered with a 5xx status.
    Server(u16),
    /// The server answered with a 4xx status.
    Client(u16),
    /// The body could not be decoded.
    Decode,
    /// Anything else (request construction, redirects, ...).
    Unknown,
}

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// What went wrong.
    pub kind: ApiErrorKind,
    /// Best available description (server-provided message when present).
    pub message: String,
    /// Id of the request that failed, if one was sent.
    pub request_id: Option<String>,
}

impl ApiError {
    /// Create an error without a request id.
    #[must_use]
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request_id: None,
        }
    }

    /// Attach the id of the request that failed.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// HTTP status, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self.kind {
            ApiErrorKind::Server(status) | ApiErrorKind::Client(status) => Some(status),
            _ => None,
        }
    }

    /// Whether the request never got a response.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Network)
    }

    /// Whether the request timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Timeout)
    }

    /// Whether the server failed (5xx).
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Server(_))
    }

    /// Whether the request was rejected (4xx).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Client(_))
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::Network | ApiErrorKind::Timeout | ApiErrorKind::Server(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_is_message() {
        let err = ApiError::new(ApiErrorKind::Client(404), "Resource not found");
        assert_eq!(err.to_string(), "Resource not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ApiError::new(ApiErrorKind::Network, "x").is_retryable());
        assert!(ApiError::new(ApiErrorKind::Timeout, "x").is_retryable());
        assert!(ApiError::new(ApiErrorKind::Server(503), "x").is_retryable());
        assert!(!ApiError::new(ApiErrorKind::Client(400), "x").is_retryable());
        assert!(!ApiError::new(ApiErrorKind::Decode, "x").is_retryable());
        assert!(!ApiError::new(ApiErrorKind::Unknown, "x").is_retryable());
    }

    #[test]
    fn test_classification_flags() {
        let err = ApiError::new(ApiErrorKind::Server(500), "boom").with_request_id("req_1");
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
        assert!(!err.is_network_error());
        assert!(!err.is_timeout());
        assert_eq!(err.request_id.as_deref(), Some("req_1"));
    }
}
