//! Key-value persistence for the signed-in session.
//!
//! The session store writes two entries: the user record as JSON under
//! [`keys::USER`] and the session token under [`keys::AUTH_TOKEN`]. Both are
//! present or both absent.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::future::Future;

use thiserror::Error;

/// Storage keys for session data.
pub mod keys {
    /// Key for the serialized current user.
    pub const USER: &str = "user";

    /// Key for the session token.
    pub const AUTH_TOKEN: &str = "authToken";
}

/// Errors that can occur while reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing data could not be decoded.
    #[error("storage is corrupt: {0}")]
    Corrupt(String),

    /// The store cannot be used right now.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous string key-value store.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read a value, `None` if absent.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove a value. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}
