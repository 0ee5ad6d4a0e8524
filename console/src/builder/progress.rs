//! Progress accounting for a full refresh

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::events::{EventBus, Payload, Topics};

/// Counts VMs received against the number the VM query promised.
/// Each increment publishes the new percentage.
#[derive(Debug)]
pub struct RefreshProgress {
    bus: EventBus,
    total: usize,
    received: AtomicUsize,
}

impl RefreshProgress {
    pub fn new(bus: EventBus, total: usize) -> Self {
        Self {
            bus,
            total,
            received: AtomicUsize::new(0),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    /// Complete once every expected VM arrived; an empty refresh is complete from the start
    pub fn is_complete(&self) -> bool {
        self.received() >= self.total
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        100.0 * self.received().min(self.total) as f64 / self.total as f64
    }

    /// Record one received VM. Returns true on the increment that completes the refresh.
    pub fn increment(&self) -> bool {
        if self.total == 0 {
            return false;
        }
        let received = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        if received > self.total {
            return false;
        }
        self.bus
            .publish(Topics::PROGRESS_UPDATE, Payload::Progress(self.percentage_of(received)));
        received == self.total
    }

    fn percentage_of(&self, received: usize) -> f64 {
        100.0 * received as f64 / self.total as f64
    }
}
