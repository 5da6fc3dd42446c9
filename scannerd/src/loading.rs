//! Shared loading-progress counters.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Progress of the plugin indexer, shared with every session.
///
/// The indexer publishes counts here; sessions only read them. A zero
/// total means no load is underway.
#[derive(Debug, Default)]
pub struct LoadingProgress {
    current: AtomicUsize,
    total: AtomicUsize,
}

impl LoadingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the number of indexed plugins and the expected total.
    pub fn publish(&self, current: usize, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.current.store(current, Ordering::Relaxed);
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// True while the indexer still has plugins to process.
    pub fn in_progress(&self) -> bool {
        let total = self.total();
        total != 0 && self.current() < total
    }
}
