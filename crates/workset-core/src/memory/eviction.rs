//! Capacity enforcement for a working store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workset_state::Item;

/// Result of trimming a store to capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictionOutcome {
    /// Retained items, in their original insertion order.
    pub kept: Vec<Item>,
    /// Displaced items, highest score first.
    pub evicted: Vec<Item>,
}

impl EvictionOutcome {
    pub fn evicted_count(&self) -> usize {
        self.evicted.len()
    }
}

/// `activation + 1 / (ms since last access + 1)`.
///
/// The recency term is at most 1.0 and only separates items of near-equal
/// activation in favour of the more recently touched one.
pub fn eviction_score(item: &Item, now: DateTime<Utc>) -> f64 {
    let since_ms = (now - item.last_accessed).num_milliseconds().max(0) as f64;
    item.activation + 1.0 / (since_ms + 1.0)
}

/// Keep the `capacity` highest-scoring items.
///
/// Ranking is a stable descending sort on [`eviction_score`], so equal
/// scores keep insertion order and the evicted set is exactly the bottom
/// `len - capacity` items of that ranking.
pub fn enforce_capacity(items: Vec<Item>, capacity: usize, now: DateTime<Utc>) -> EvictionOutcome {
    if items.len() <= capacity {
        return EvictionOutcome {
            kept: items,
            evicted: Vec::new(),
        };
    }

    let mut ranked: Vec<(usize, f64)> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| (idx, eviction_score(item, now)))
        .collect();
    ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    let mut keep = vec![false; items.len()];
    for (idx, _) in ranked.iter().take(capacity) {
        keep[*idx] = true;
    }
    let evicted_order: Vec<usize> = ranked.iter().skip(capacity).map(|(idx, _)| *idx).collect();

    let mut slots: Vec<Option<Item>> = items.into_iter().map(Some).collect();
    let evicted = evicted_order
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect();
    let kept = slots
        .into_iter()
        .zip(keep)
        .filter_map(|(slot, kept)| if kept { slot } else { None })
        .collect();

    EvictionOutcome { kept, evicted }
}

/// Make room for `newcomer` and admit it.
///
/// Only `existing` items compete for the `capacity - 1` remaining slots, so
/// the newcomer is always kept and always last in `kept`, whatever the scores.
pub fn admit(
    existing: Vec<Item>,
    newcomer: Item,
    capacity: usize,
    now: DateTime<Utc>,
) -> EvictionOutcome {
    let mut outcome = enforce_capacity(existing, capacity.saturating_sub(1), now);
    outcome.kept.push(newcomer);
    outcome
}
