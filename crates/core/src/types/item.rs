//! Catalog items and the raw records they are built from.

use serde::{Deserialize, Serialize};

use super::{ItemId, Price};

/// Category names, assigned round-robin by list position or record id.
pub const CATEGORIES: [&str; 5] = ["Electronics", "Clothing", "Books", "Home", "Sports"];

/// A record as returned by the remote posts API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Record id.
    pub id: ItemId,
    /// Record title.
    pub title: String,
    /// Record body, shown as the item description.
    pub body: String,
}

/// Customer rating summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Average rating, 0.0 to 5.0 with one decimal.
    pub rate: f64,
    /// Number of ratings.
    pub count: u32,
}

/// A catalog item as displayed in the feed and detail views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item id (same as the underlying record id).
    pub id: ItemId,
    /// Item title.
    pub title: String,
    /// Long description.
    pub description: String,
    /// Price in USD.
    pub price: Price,
    /// One of [`CATEGORIES`].
    pub category: String,
    /// Image URL.
    pub image: String,
    /// Rating summary.
    pub rating: Rating,
}

/// One page of items with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsPage {
    /// Items on this page.
    pub items: Vec<Item>,
    /// Total number of items available.
    pub total: usize,
    /// Offset of the first item.
    pub skip: usize,
    /// Page size requested.
    pub limit: usize,
}

/// Category for a position or id, cycling through [`CATEGORIES`].
#[must_use]
#[allow(clippy::indexing_slicing)] // modulo keeps the index in bounds
pub fn category_for(key: usize) -> &'static str {
    CATEGORIES[key % CATEGORIES.len()]
}
