//! Rehearsal: boosting a focused item and its associates.

use chrono::{DateTime, Utc};
use workset_state::{ItemId, WorkingStore};

use super::decay::DecayEngine;
use crate::config::EngineConfig;

/// What a focus pass changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusOutcome {
    /// Whether the focused id was present in the store.
    pub found: bool,
    /// Associates that received the secondary boost.
    pub boosted: Vec<ItemId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttentionController {
    decay: DecayEngine,
    rehearsal_boost: f64,
    association_strength: f64,
}

impl AttentionController {
    pub fn new(decay: DecayEngine, rehearsal_boost: f64, association_strength: f64) -> Self {
        Self {
            decay,
            rehearsal_boost,
            association_strength,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            DecayEngine::from_config(config),
            config.rehearsal_boost,
            config.association_strength,
        )
    }

    /// Decay the store to `now`, then rehearse `item_id`.
    ///
    /// The focused item gains `rehearsal_boost`, a fresh `last_accessed` and
    /// one more access. Each still-present associate gains
    /// `association_strength` and nothing else. An unknown id only decays the
    /// store and advances `last_update`; `focus` is left as it was.
    pub fn focus(&self, store: &mut WorkingStore, item_id: &ItemId, now: DateTime<Utc>) -> FocusOutcome {
        self.decay.apply(&mut store.items, store.last_update, now);
        store.last_update = now;

        let Some(target) = store.items.iter_mut().find(|i| &i.id == item_id) else {
            return FocusOutcome {
                found: false,
                boosted: Vec::new(),
            };
        };
        target.activation = (target.activation + self.rehearsal_boost).min(1.0);
        target.last_accessed = now;
        target.access_count = target.access_count.saturating_add(1);
        let associates = target.associations.clone();

        let mut boosted = Vec::new();
        for assoc_id in &associates {
            if assoc_id == item_id {
                continue;
            }
            if let Some(assoc) = store.items.iter_mut().find(|i| &i.id == assoc_id) {
                assoc.activation = (assoc.activation + self.association_strength).min(1.0);
                boosted.push(assoc_id.clone());
            }
        }

        store.focus = Some(item_id.clone());
        FocusOutcome {
            found: true,
            boosted,
        }
    }
}

impl Default for AttentionController {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use workset_state::{Item, ItemCategory, OwnerId, Provenance};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn item(id: &str, activation: f64, associations: &[&str]) -> Item {
        Item {
            id: ItemId::from(id),
            content: id.into(),
            category: ItemCategory::Concept,
            activation,
            last_accessed: t0(),
            access_count: 1,
            associations: associations.iter().map(|a| ItemId::from(*a)).collect(),
            provenance: Provenance::Chat,
            metadata: serde_json::json!({}),
            created_at: t0(),
        }
    }

    fn store(items: Vec<Item>) -> WorkingStore {
        let mut s = WorkingStore::new(OwnerId::from("u"), "s", 7, t0());
        s.items = items;
        s
    }

    #[test]
    fn boosts_target_and_associate() {
        let mut s = store(vec![
            item("t", 0.8, &["a"]),
            item("a", 0.4, &[]),
            item("x", 0.5, &[]),
        ]);
        let out = AttentionController::default().focus(&mut s, &ItemId::from("t"), t0());

        assert!(out.found);
        assert_eq!(out.boosted, vec![ItemId::from("a")]);
        assert_eq!(s.items[0].activation, 1.0);
        assert_eq!(s.items[0].access_count, 2);
        assert!((s.items[1].activation - 0.6).abs() < 1e-12);
        assert_eq!(s.items[1].access_count, 1);
        assert_eq!(s.items[1].last_accessed, t0());
        assert_eq!(s.items[2].activation, 0.5);
        assert_eq!(s.focus, Some(ItemId::from("t")));
    }

    #[test]
    fn decays_before_boosting() {
        let mut s = store(vec![item("t", 0.5, &[])]);
        let later = t0() + Duration::minutes(2);
        AttentionController::default().focus(&mut s, &ItemId::from("t"), later);

        let decayed = 0.5 - 0.1 * 2.0 * (1.0 - 2f64.ln() * 0.1);
        assert!((s.items[0].activation - (decayed + 0.3)).abs() < 1e-9);
        assert_eq!(s.items[0].last_accessed, later);
        assert_eq!(s.last_update, later);
    }

    #[test]
    fn dangling_associate_is_skipped() {
        let mut s = store(vec![item("t", 0.2, &["gone"])]);
        let out = AttentionController::default().focus(&mut s, &ItemId::from("t"), t0());
        assert!(out.found);
        assert!(out.boosted.is_empty());
    }

    #[test]
    fn unknown_item_only_decays() {
        let mut s = store(vec![item("t", 0.9, &[])]);
        s.focus = Some(ItemId::from("t"));
        let later = t0() + Duration::minutes(1);
        let out = AttentionController::default().focus(&mut s, &ItemId::from("nope"), later);

        assert!(!out.found);
        assert!(s.items[0].activation < 0.9);
        assert_eq!(s.items[0].access_count, 1);
        assert_eq!(s.focus, Some(ItemId::from("t")));
        assert_eq!(s.last_update, later);
    }
}
