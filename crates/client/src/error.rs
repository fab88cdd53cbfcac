//! Store-level errors and Sentry integration.
//!
//! Store operations never leak transport or storage errors into state: they
//! are logged, recorded as Sentry breadcrumbs, and replaced with one of the
//! short user-facing [`messages`].

use thiserror::Error;

use itemdeck_core::User;

/// User-facing messages stored in `error` fields.
pub mod messages {
    /// Credential check could not be completed (transport or storage failure).
    pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
    /// Persisted session keys could not be removed on logout.
    pub const LOGOUT_FAILED: &str = "Logout failed";
    /// Persisted session keys could not be read.
    pub const CHECK_AUTH_FAILED: &str = "Failed to check auth state";
    /// Item list request failed.
    pub const FETCH_ITEMS_FAILED: &str = "Failed to fetch items";
    /// Item detail request failed.
    pub const FETCH_ITEM_FAILED: &str = "Failed to fetch item details";
}

/// Why a store operation did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The operation failed; the message is what the store recorded as `error`.
    #[error("{0}")]
    Rejected(String),

    /// A newer request of the same kind was issued before this one finished,
    /// so its result was discarded.
    #[error("superseded by a newer request")]
    Superseded,
}

impl StoreError {
    /// The message to show the user, if any.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) => Some(message),
            Self::Superseded => None,
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Set the Sentry user context from the signed-in user.
///
/// Call this after a login or session restore so errors are associated with
/// the user.
pub fn set_sentry_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a store transition.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("catalog", "Item fetch failed", Some(&[("item_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Rejected(messages::FETCH_ITEMS_FAILED.to_string());
        assert_eq!(err.to_string(), "Failed to fetch items");
        assert_eq!(err.user_message(), Some("Failed to fetch items"));
    }

    #[test]
    fn test_superseded_has_no_user_message() {
        assert_eq!(StoreError::Superseded.user_message(), None);
    }

    #[test]
    fn test_sentry_helpers_without_client() {
        // Without an initialized client these are no-ops and must not panic.
        let user = User {
            id: itemdeck_core::UserId::new("1"),
            email: "test@example.com".to_string(),
            name: None,
        };
        set_sentry_user(&user);
        add_breadcrumb("session", "login", Some(&[("user_id", "1")]));
        clear_sentry_user();
    }
}
