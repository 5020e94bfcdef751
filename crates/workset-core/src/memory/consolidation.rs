//! Promotion of important working items into long-term memory.
//!
//! Two entry points share one record format:
//! - [`ConsolidationGateway::try_consolidate`] handles a single item pushed
//!   out by capacity enforcement.
//! - [`ConsolidationGateway::sweep`] is the end-of-session pass: decay,
//!   promote every important item, then prune what has faded.
//!
//! Long-term writes are best effort. A failed write is logged and counted,
//! and the sweep moves on to the next item.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workset_state::{
    ConsolidationContext, ConsolidationRecord, Importance, Item, ItemCategory, ItemId,
    LongTermMemoryStore, MemoryType, RecordId, WorkingStore,
};

use super::decay::DecayEngine;
use super::error::{MemoryResult, WorkingMemoryError};
use crate::config::EngineConfig;
use crate::metrics::METRICS;
use crate::obs;

pub const CONSOLIDATION_SOURCE: &str = "working_memory_consolidation";
const SUMMARY_PREFIX: &str = "Consolidated from working memory: ";
const SUMMARY_MAX_CHARS: usize = 100;
const MAX_KEYWORDS: usize = 10;

/// Long-term memory type an item category is filed under.
pub fn map_category(category: ItemCategory) -> MemoryType {
    match category {
        ItemCategory::Concept => MemoryType::DomainKnowledge,
        ItemCategory::Entity => MemoryType::EntityRelation,
        ItemCategory::Task => MemoryType::TaskHistory,
        ItemCategory::Preference => MemoryType::UserPreference,
        ItemCategory::Context => MemoryType::ConversationContext,
    }
}

/// First ten lowercased whitespace tokens of `content`, in order.
pub fn keywords(content: &str) -> Vec<String> {
    content
        .split_whitespace()
        .take(MAX_KEYWORDS)
        .map(str::to_lowercase)
        .collect()
}

/// Outcome of a consolidation sweep over one store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Important items whose long-term write succeeded.
    pub consolidated: Vec<ItemId>,
    /// Important items whose long-term write failed.
    pub failed: Vec<ItemId>,
    /// Items dropped because activation fell to the prune floor.
    pub pruned: Vec<ItemId>,
    /// Items left in the store after pruning.
    pub remaining: usize,
}

#[derive(Clone)]
pub struct ConsolidationGateway {
    long_term: Arc<dyn LongTermMemoryStore>,
    decay: DecayEngine,
    importance_activation: f64,
    importance_access_count: u32,
    high_importance_activation: f64,
    prune_floor: f64,
}

impl ConsolidationGateway {
    pub fn new(long_term: Arc<dyn LongTermMemoryStore>, config: &EngineConfig) -> Self {
        Self {
            long_term,
            decay: DecayEngine::from_config(config),
            importance_activation: config.importance_activation,
            importance_access_count: config.importance_access_count,
            high_importance_activation: config.high_importance_activation,
            prune_floor: config.prune_floor,
        }
    }

    /// Strong or frequently rehearsed enough to be worth keeping.
    pub fn is_important(&self, item: &Item) -> bool {
        item.activation > self.importance_activation
            || item.access_count > self.importance_access_count
    }

    pub fn build_record(&self, item: &Item, session: &str) -> ConsolidationRecord {
        let excerpt: String = item.content.chars().take(SUMMARY_MAX_CHARS).collect();
        let importance = if item.activation > self.high_importance_activation {
            Importance::High
        } else {
            Importance::Medium
        };
        ConsolidationRecord {
            memory_type: map_category(item.category),
            content: item.content.clone(),
            summary: format!("{SUMMARY_PREFIX}{excerpt}"),
            keywords: keywords(&item.content),
            context: ConsolidationContext {
                session: session.to_string(),
                access_count: item.access_count,
                final_activation: item.activation,
                associations: item.associations.clone(),
            },
            importance,
            confidence: item.activation,
            source: CONSOLIDATION_SOURCE.to_string(),
        }
    }

    /// Write one item to long-term memory.
    pub async fn consolidate(&self, item: &Item, session: &str) -> MemoryResult<RecordId> {
        let record = self.build_record(item, session);
        let memory_type = record.memory_type;
        let record_id = self
            .long_term
            .store(record)
            .await
            .map_err(|e| WorkingMemoryError::ExternalDependency(e.to_string()))?;
        obs::emit_item_consolidated(item.id.as_str(), memory_type.as_str(), &record_id.0);
        METRICS.inc_items_consolidated();
        Ok(record_id)
    }

    /// [`consolidate`](Self::consolidate) with the failure logged and swallowed.
    pub async fn try_consolidate(&self, item: &Item, session: &str) -> Option<RecordId> {
        match self.consolidate(item, session).await {
            Ok(id) => Some(id),
            Err(e) => {
                obs::emit_consolidation_failed(item.id.as_str(), &e);
                METRICS.inc_consolidation_failures();
                None
            }
        }
    }

    /// Decay `store` to `now`, promote its important items, prune the rest.
    ///
    /// Importance is judged on decayed activation. Promoted items stay in the
    /// store unless they are also below the prune floor. The store is mutated
    /// in place; persisting it is the caller's job.
    pub async fn sweep(&self, store: &mut WorkingStore, now: DateTime<Utc>) -> SweepReport {
        self.decay.apply(&mut store.items, store.last_update, now);
        store.last_update = now;

        let mut report = SweepReport::default();
        for item in store.items.iter().filter(|i| self.is_important(i)) {
            match self.try_consolidate(item, &store.session).await {
                Some(_) => report.consolidated.push(item.id.clone()),
                None => report.failed.push(item.id.clone()),
            }
        }

        let floor = self.prune_floor;
        let (kept, pruned): (Vec<Item>, Vec<Item>) = std::mem::take(&mut store.items)
            .into_iter()
            .partition(|i| i.activation > floor);
        report.pruned = pruned.into_iter().map(|i| i.id).collect();
        store.items = kept;
        if let Some(focus) = &store.focus {
            if store.item(focus).is_none() {
                store.focus = None;
            }
        }
        report.remaining = store.items.len();

        METRICS.add_items_pruned(report.pruned.len() as u64);
        obs::emit_store_swept(
            report.consolidated.len(),
            report.failed.len(),
            report.pruned.len(),
            report.remaining,
        );
        report
    }
}

impl std::fmt::Debug for ConsolidationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsolidationGateway")
            .field("decay", &self.decay)
            .field("importance_activation", &self.importance_activation)
            .field("importance_access_count", &self.importance_access_count)
            .field("prune_floor", &self.prune_floor)
            .finish_non_exhaustive()
    }
}
