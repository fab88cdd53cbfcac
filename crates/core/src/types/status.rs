//! Lifecycle status of an asynchronous fetch.

use serde::{Deserialize, Serialize};

/// Phase of one logical resource (a login attempt, the item list, ...).
///
/// Every store operation moves its resource from `Loading` to exactly one of
/// `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request completed successfully.
    Succeeded,
    /// The last request failed.
    Failed,
}

impl FetchStatus {
    /// Whether a request is currently in flight.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the resource has settled (succeeded or failed).
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(FetchStatus::default(), FetchStatus::Idle);
    }

    #[test]
    fn test_loading_and_settled_are_exclusive() {
        for status in [
            FetchStatus::Idle,
            FetchStatus::Loading,
            FetchStatus::Succeeded,
            FetchStatus::Failed,
        ] {
            assert!(!(status.is_loading() && status.is_settled()));
        }
        assert!(FetchStatus::Failed.is_settled());
        assert!(!FetchStatus::Idle.is_settled());
    }
}
