//! Session token issued by the auth service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Opaque session token persisted alongside the user record.
///
/// The mock backend issues `mock-jwt-token-<user id>-<unix millis>`. Until
/// a real backend verifies signatures and expiry, a token is considered
/// valid iff it carries that prefix.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Prefix every token minted by the mock auth service starts with.
    pub const PREFIX: &'static str = "mock-jwt-token-";

    /// Wrap a raw token string (e.g. one read back from storage).
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Mint a token for `user_id` at `issued_at`.
    #[must_use]
    pub fn mint(user_id: &UserId, issued_at: DateTime<Utc>) -> Self {
        Self(format!(
            "{}{}-{}",
            Self::PREFIX,
            user_id,
            issued_at.timestamp_millis()
        ))
    }

    /// Whether the token has the shape of a token we issued.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Self::is_valid_str(&self.0)
    }

    /// Validity check on a raw string without wrapping it.
    #[must_use]
    pub fn is_valid_str(raw: &str) -> bool {
        !raw.is_empty() && raw.starts_with(Self::PREFIX)
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens grant access; keep them out of logs.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}
