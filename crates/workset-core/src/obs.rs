//! Structured observability hooks for working-store lifecycle events.
//!
//! This module provides:
//! - Store-scoped tracing spans via the `StoreSpan` RAII guard
//! - Emission functions for item lifecycle events and consolidation sweeps
//!
//! Events are emitted at `info!` level, failures at `warn!`. Filtering and
//! JSON output are configured through [`crate::telemetry::init_tracing`].

use tracing::info;

/// RAII guard that enters a store-scoped tracing span for one operation.
///
/// ```ignore
/// let _span = StoreSpan::enter(&owner, "session-1", "add_item");
/// // every event below carries owner, session and op
/// ```
pub struct StoreSpan {
    _span: tracing::span::EnteredSpan,
}

impl StoreSpan {
    pub fn enter(owner: &str, session: &str, op: &'static str) -> Self {
        let span = tracing::info_span!("workset.store", owner = %owner, session = %session, op = op);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_item_added(item_id: &str, category: &str, store_len: usize) {
    info!(event = "item.added", item_id = %item_id, category = %category, store_len = store_len);
}

/// Emit event: an item was displaced by capacity enforcement.
pub fn emit_item_evicted(item_id: &str, activation: f64, consolidate: bool) {
    info!(
        event = "item.evicted",
        item_id = %item_id,
        activation = activation,
        consolidate = consolidate,
    );
}

pub fn emit_item_focused(item_id: &str, found: bool, boosted: usize) {
    info!(event = "item.focused", item_id = %item_id, found = found, boosted = boosted);
}

pub fn emit_item_consolidated(item_id: &str, memory_type: &str, record_id: &str) {
    info!(
        event = "item.consolidated",
        item_id = %item_id,
        memory_type = %memory_type,
        record_id = %record_id,
    );
}

/// Emit event: a long-term write failed (warning level). The item is not retried.
pub fn emit_consolidation_failed(item_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "consolidation.failed", item_id = %item_id, error = %error);
}

/// Emit event: a consolidation sweep finished for one store.
pub fn emit_store_swept(consolidated: usize, failed: usize, pruned: usize, remaining: usize) {
    info!(
        event = "store.swept",
        consolidated = consolidated,
        failed = failed,
        pruned = pruned,
        remaining = remaining,
    );
}
