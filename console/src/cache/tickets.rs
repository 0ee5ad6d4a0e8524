//! Request tickets ordering fetches that commit into the caches

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket counter. A fetch draws a ticket when it is issued; when two
/// commits race, the one holding the higher ticket wins.
#[derive(Debug, Default)]
pub struct Tickets {
    last: AtomicU64,
}

impl Tickets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a fresh ticket, greater than every ticket issued before
    pub fn issue(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued ticket
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}
