//! Authenticated user record.

use serde::{Deserialize, Serialize};

use super::UserId;

/// The user returned by a successful credential check.
///
/// This is also the shape persisted under the `user` storage key, so field
/// names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Auth-service user id.
    pub id: UserId,
    /// Login email as registered (kept as a plain string so stale records
    /// from older builds still deserialize).
    pub email: String,
    /// Display name, if the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl User {
    /// Name to greet the user with, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_shape() {
        let user = User {
            id: UserId::new("1"),
            email: "test@example.com".to_string(),
            name: Some("Test User".to_string()),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1","email":"test@example.com","name":"Test User"}"#
        );
    }

    #[test]
    fn test_name_is_optional() {
        let user: User = serde_json::from_str(r#"{"id":"2","email":"a@b.co"}"#).unwrap();
        assert_eq!(user.name, None);
        assert_eq!(user.display_name(), "a@b.co");
    }
}
