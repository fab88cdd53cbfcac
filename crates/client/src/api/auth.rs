//! Authentication service.
//!
//! [`MockAuthApi`] knows a single seeded account and issues
//! `mock-jwt-token-*` tokens. It stands in for a real backend until one
//! exists.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, info, instrument};

use itemdeck_core::{SessionToken, User, UserId};

use super::{ApiError, ApiErrorKind, AuthApi};
use crate::error::messages;

/// Email of the seeded account.
pub const SEEDED_EMAIL: &str = "test@example.com";

/// Password of the seeded account.
pub const PASSWORD: &str = "password123";

/// Errors that can occur during a credential check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No account with that email.
    #[error("User not found")]
    UserNotFound,

    /// Account exists but the password does not match.
    #[error("Invalid password")]
    InvalidPassword,

    /// The credential check could not be completed.
    #[error("auth transport error: {0}")]
    Transport(#[from] ApiError),
}

impl AuthError {
    /// Message recorded in the session state for this failure.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::UserNotFound => "User not found",
            Self::InvalidPassword => "Invalid password",
            Self::Transport(_) => messages::LOGIN_FAILED,
        }
    }
}

/// A successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    /// The signed-in user.
    pub user: User,
    /// Session token to persist.
    pub token: SessionToken,
}

/// In-process auth backend with one seeded account.
///
/// Cloning shares the offline switch.
#[derive(Debug, Clone)]
pub struct MockAuthApi {
    users: Arc<[User]>,
    latency: Duration,
    offline: Arc<AtomicBool>,
}

impl Default for MockAuthApi {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl MockAuthApi {
    /// Create the backend, sleeping `latency` before every response.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            users: Arc::from([User {
                id: UserId::new("1"),
                email: SEEDED_EMAIL.to_string(),
                name: Some("Test User".to_string()),
            }]),
            latency,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate losing (or regaining) connectivity.
    ///
    /// While offline every call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    async fn round_trip(&self) -> Result<(), ApiError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::new(
                ApiErrorKind::Network,
                "auth service unreachable",
            ));
        }
        Ok(())
    }
}

impl AuthApi for MockAuthApi {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &SecretString) -> Result<LoginGrant, AuthError> {
        self.round_trip().await?;

        let user = self
            .users
            .iter()
            .find(|u| u.email == email)
            .ok_or(AuthError::UserNotFound)?;

        if password.expose_secret() != PASSWORD {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidPassword);
        }

        let token = SessionToken::mint(&user.id, Utc::now());
        info!(user_id = %user.id, "Credentials accepted");

        Ok(LoginGrant {
            user: user.clone(),
            token,
        })
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        self.round_trip().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[tokio::test]
    async fn test_seeded_login() {
        let api = MockAuthApi::default();
        let grant = api.login(SEEDED_EMAIL, &secret(PASSWORD)).await.unwrap();
        assert_eq!(grant.user.id, "1");
        assert_eq!(grant.user.name.as_deref(), Some("Test User"));
        assert!(grant.token.is_valid());
        assert!(grant.token.as_str().starts_with("mock-jwt-token-1-"));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let api = MockAuthApi::default();
        let err = api
            .login("nobody@x.com", &secret("anything"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::UserNotFound);
        assert_eq!(err.user_message(), "User not found");
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let api = MockAuthApi::default();
        let err = api.login(SEEDED_EMAIL, &secret("nope")).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidPassword);
        assert_eq!(err.user_message(), "Invalid password");
    }

    #[tokio::test]
    async fn test_email_match_is_exact() {
        let api = MockAuthApi::default();
        let err = api
            .login("Test@Example.com", &secret(PASSWORD))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::UserNotFound);
    }

    #[tokio::test]
    async fn test_offline_is_transport_failure() {
        let api = MockAuthApi::default();
        api.set_offline(true);

        let err = api.login(SEEDED_EMAIL, &secret(PASSWORD)).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(ref e) if e.is_network_error()));
        assert_eq!(err.user_message(), messages::LOGIN_FAILED);
        assert!(api.logout().await.is_err());

        api.set_offline(false);
        assert!(api.logout().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let api = MockAuthApi::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        api.logout().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
