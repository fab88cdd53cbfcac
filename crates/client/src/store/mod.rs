//! State stores.
//!
//! Each store keeps its state in a `watch` channel and changes it only by
//! running a pure reducer over typed events. Front ends read snapshots or
//! subscribe to changes.

mod catalog;
mod sequence;
mod session;
mod transform;

pub use catalog::{CatalogEvent, CatalogState, CatalogStore};
pub use sequence::RequestSequence;
pub use session::{SessionEvent, SessionState, SessionStore};
pub use transform::ItemTransform;

/// Catalog reducer.
pub use catalog::reduce as reduce_catalog;
/// Session reducer.
pub use session::reduce as reduce_session;
