//! Global atomic counters for Workset observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a daemon tick).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Process-wide atomic counters. No allocation, no locking.
pub struct Metrics {
    items_added: AtomicU64,
    items_evicted: AtomicU64,
    items_consolidated: AtomicU64,
    consolidation_failures: AtomicU64,
    items_pruned: AtomicU64,
    focus_boosts: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            items_added: AtomicU64::new(0),
            items_evicted: AtomicU64::new(0),
            items_consolidated: AtomicU64::new(0),
            consolidation_failures: AtomicU64::new(0),
            items_pruned: AtomicU64::new(0),
            focus_boosts: AtomicU64::new(0),
        }
    }

    pub fn inc_items_added(&self) {
        self.items_added.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "items_added", "counter incremented");
    }

    pub fn add_items_evicted(&self, n: u64) {
        self.items_evicted.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "items_evicted", n, "counter incremented");
    }

    pub fn inc_items_consolidated(&self) {
        self.items_consolidated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "items_consolidated", "counter incremented");
    }

    pub fn inc_consolidation_failures(&self) {
        self.consolidation_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "consolidation_failures", "counter incremented");
    }

    pub fn add_items_pruned(&self, n: u64) {
        self.items_pruned.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "items_pruned", n, "counter incremented");
    }

    pub fn inc_focus_boosts(&self) {
        self.focus_boosts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "focus_boosts", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            items_added = self.items_added(),
            items_evicted = self.items_evicted(),
            items_consolidated = self.items_consolidated(),
            consolidation_failures = self.consolidation_failures(),
            items_pruned = self.items_pruned(),
            focus_boosts = self.focus_boosts(),
        );
    }

    pub fn items_added(&self) -> u64 {
        self.items_added.load(Ordering::Relaxed)
    }

    pub fn items_evicted(&self) -> u64 {
        self.items_evicted.load(Ordering::Relaxed)
    }

    pub fn items_consolidated(&self) -> u64 {
        self.items_consolidated.load(Ordering::Relaxed)
    }

    pub fn consolidation_failures(&self) -> u64 {
        self.consolidation_failures.load(Ordering::Relaxed)
    }

    pub fn items_pruned(&self) -> u64 {
        self.items_pruned.load(Ordering::Relaxed)
    }

    pub fn focus_boosts(&self) -> u64 {
        self.focus_boosts.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.items_added.store(0, Ordering::Relaxed);
        self.items_evicted.store(0, Ordering::Relaxed);
        self.items_consolidated.store(0, Ordering::Relaxed);
        self.consolidation_failures.store(0, Ordering::Relaxed);
        self.items_pruned.store(0, Ordering::Relaxed);
        self.focus_boosts.store(0, Ordering::Relaxed);
    }
}
