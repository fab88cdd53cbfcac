//! Cache types for posts API responses.

use itemdeck_core::{ItemId, RawRecord};

/// Cache key for raw records.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Records,
    Record(ItemId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Records(Vec<RawRecord>),
    Record(RawRecord),
}
