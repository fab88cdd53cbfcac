//! Request sequencing.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket counter for one logical resource.
///
/// Each operation takes a ticket when it begins; its completion is applied
/// only while that ticket is still the latest issued.
#[derive(Debug, Default)]
pub struct RequestSequence(AtomicU64);

impl RequestSequence {
    /// Issue the next ticket. Tickets start at 1.
    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ticket` is the latest issued.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}
