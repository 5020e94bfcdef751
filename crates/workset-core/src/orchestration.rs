//! Public working-memory operations.
//!
//! [`WorkingMemoryService`] composes decay, eviction, association, rehearsal
//! and consolidation into the externally visible operations. Each mutating
//! operation is one read-modify-write cycle against the [`SessionRepository`]:
//! the store is loaded, transformed in memory, then written back with a
//! compare-and-swap on its version. A concurrent writer surfaces as
//! `Storage(VersionConflict)` rather than a lost update.
//!
//! Stores move `Uninitialized -> Active` on `initialize` and never leave
//! `Active`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use workset_state::{
    Item, ItemId, LongTermMemoryStore, OwnerId, SessionRepository, StoreId, StoreKey, StorePatch,
    WorkingStore,
};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::identity::{Caller, IdentityResolver};
use crate::memory::{
    admit, build_graph_view, link_new_item, AttentionController, ConsolidationGateway,
    DecayEngine, FocusOutcome, GraphView, ItemSpec, MemoryResult, SweepReport, ValidationError,
    WorkingMemoryError,
};
use crate::metrics::METRICS;
use crate::obs::{self, StoreSpan};

/// Decayed, read-only snapshot of a store returned by `get_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    pub store_id: StoreId,
    pub session: String,
    pub capacity: usize,
    pub focus: Option<ItemId>,
    /// Items above the prune floor, activations decayed to `as_of`.
    pub items: Vec<Item>,
    /// The persisted decay anchor. Reads never move it.
    pub last_update: DateTime<Utc>,
    pub as_of: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphView>,
}

/// Totals from a consolidation run over one or more stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSweepReport {
    pub stores_swept: usize,
    pub consolidated: usize,
    pub failed: usize,
    pub pruned: usize,
    /// Stores whose write-back failed; their changes were discarded.
    pub stores_skipped: usize,
}

impl SessionSweepReport {
    fn absorb(&mut self, store: &SweepReport) {
        self.stores_swept += 1;
        self.consolidated += store.consolidated.len();
        self.failed += store.failed.len();
        self.pruned += store.pruned.len();
    }
}

#[derive(Clone)]
pub struct WorkingMemoryService {
    sessions: Arc<dyn SessionRepository>,
    identity: Arc<dyn IdentityResolver>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    decay: DecayEngine,
    attention: AttentionController,
    gateway: ConsolidationGateway,
}

impl WorkingMemoryService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        long_term: Arc<dyn LongTermMemoryStore>,
        identity: Arc<dyn IdentityResolver>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(sessions, long_term, identity, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        sessions: Arc<dyn SessionRepository>,
        long_term: Arc<dyn LongTermMemoryStore>,
        identity: Arc<dyn IdentityResolver>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sessions,
            identity,
            clock,
            decay: DecayEngine::from_config(&config),
            attention: AttentionController::from_config(&config),
            gateway: ConsolidationGateway::new(long_term, &config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create the store for `(caller, session)` or return the existing one's id.
    ///
    /// An existing store keeps its original capacity even if a different one
    /// is requested.
    pub async fn initialize(
        &self,
        caller: &Caller,
        session: &str,
        capacity: Option<usize>,
    ) -> MemoryResult<StoreId> {
        let owner = self.identity.resolve(caller).await?;
        check_session(session)?;
        let _span = StoreSpan::enter(owner.as_str(), session, "initialize");

        let capacity = capacity.unwrap_or(self.config.capacity);
        if capacity == 0 {
            return Err(ValidationError::ZeroCapacity.into());
        }
        if let Some(existing) = self.sessions.get(&owner, session).await? {
            debug!(store_id = %existing.store_id, "store already initialized");
            return Ok(existing.store_id);
        }
        let store_id = self
            .sessions
            .create(&owner, session, capacity, self.clock.now())
            .await?;
        debug!(store_id = %store_id, capacity, "store created");
        Ok(store_id)
    }

    /// Insert a new item, evicting and consolidating as needed.
    ///
    /// The new item is always retained and focused; only the items already
    /// in the store compete for the remaining slots. Displaced items worth
    /// keeping are consolidated only after the store write succeeds, so a
    /// `VersionConflict` leaves long-term memory untouched and the call can be
    /// retried. Returns the new item's id.
    pub async fn add_item(
        &self,
        caller: &Caller,
        session: &str,
        spec: ItemSpec,
    ) -> MemoryResult<ItemId> {
        let owner = self.identity.resolve(caller).await?;
        let valid = spec.validate()?;
        let _span = StoreSpan::enter(owner.as_str(), session, "add_item");
        let mut store = self.load(&owner, session).await?;

        let now = self.clock.now();
        self.decay.apply(&mut store.items, store.last_update, now);

        let new_item = valid.into_item(now);
        let new_id = new_item.id.clone();
        let existing = std::mem::take(&mut store.items);
        let outcome = admit(existing, new_item.clone(), store.capacity, now);
        store.items = outcome.kept;

        link_new_item(&mut store.items, &new_item, self.config.overlap_threshold);
        store.focus = Some(new_id.clone());
        store.last_update = now;

        self.sessions
            .patch(&store.store_id, StorePatch::from_store(&store))
            .await?;

        for displaced in &outcome.evicted {
            let promote = displaced.activation > self.config.displacement_threshold;
            obs::emit_item_evicted(displaced.id.as_str(), displaced.activation, promote);
            if promote {
                self.gateway.try_consolidate(displaced, session).await;
            }
        }
        METRICS.add_items_evicted(outcome.evicted.len() as u64);

        obs::emit_item_added(new_id.as_str(), new_item.category.as_str(), store.items.len());
        METRICS.inc_items_added();
        Ok(new_id)
    }

    /// Decayed view of the store, or `None` if it was never initialized.
    ///
    /// Nothing is written back.
    pub async fn get_state(
        &self,
        caller: &Caller,
        session: &str,
        include_associations: bool,
    ) -> MemoryResult<Option<StateView>> {
        let owner = self.identity.resolve(caller).await?;
        let Some(store) = self.sessions.get(&owner, session).await? else {
            return Ok(None);
        };
        let now = self.clock.now();
        let items = self.visible_items(&store, now);
        let graph = include_associations.then(|| build_graph_view(&items));

        Ok(Some(StateView {
            store_id: store.store_id,
            session: store.session,
            capacity: store.capacity,
            focus: store.focus,
            items,
            last_update: store.last_update,
            as_of: now,
            graph,
        }))
    }

    /// Association graph over the same items `get_state` would return.
    pub async fn graph_view(&self, caller: &Caller, session: &str) -> MemoryResult<Option<GraphView>> {
        Ok(self
            .get_state(caller, session, true)
            .await?
            .and_then(|view| view.graph))
    }

    /// Rehearse `item_id` and persist the result.
    ///
    /// An unknown item id is not an error: the store is still decayed and
    /// written back, and the outcome reports `found == false`.
    pub async fn focus_item(
        &self,
        caller: &Caller,
        session: &str,
        item_id: &ItemId,
    ) -> MemoryResult<FocusOutcome> {
        let owner = self.identity.resolve(caller).await?;
        let _span = StoreSpan::enter(owner.as_str(), session, "focus_item");
        let mut store = self.load(&owner, session).await?;

        let outcome = self.attention.focus(&mut store, item_id, self.clock.now());
        self.sessions
            .patch(&store.store_id, StorePatch::from_store(&store))
            .await?;

        obs::emit_item_focused(item_id.as_str(), outcome.found, outcome.boosted.len());
        if outcome.found {
            METRICS.inc_focus_boosts();
        }
        Ok(outcome)
    }

    /// Sweep the caller's store for `session`.
    ///
    /// Never fails: identity, storage and long-term errors are logged and
    /// reflected in the report.
    pub async fn consolidate_session(&self, caller: &Caller, session: &str) -> SessionSweepReport {
        let mut report = SessionSweepReport::default();
        let owner = match self.identity.resolve(caller).await {
            Ok(owner) => owner,
            Err(e) => {
                warn!(session = %session, error = %e, "consolidation skipped: caller not resolved");
                return report;
            }
        };
        self.sweep_key(&owner, session, &mut report).await;
        report
    }

    /// Sweep every persisted store. Used by the maintenance daemon.
    pub async fn sweep_all(&self) -> SessionSweepReport {
        let mut report = SessionSweepReport::default();
        let keys = match self.sessions.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "consolidation skipped: could not list stores");
                return report;
            }
        };
        for StoreKey { owner, session } in keys {
            self.sweep_key(&owner, &session, &mut report).await;
        }
        report
    }

    async fn sweep_key(&self, owner: &OwnerId, session: &str, report: &mut SessionSweepReport) {
        let _span = StoreSpan::enter(owner.as_str(), session, "consolidate");
        let mut store = match self.sessions.get(owner, session).await {
            Ok(Some(store)) => store,
            Ok(None) => {
                debug!("no store to sweep");
                return;
            }
            Err(e) => {
                warn!(error = %e, "store load failed, skipping");
                report.stores_skipped += 1;
                return;
            }
        };

        let swept = self.gateway.sweep(&mut store, self.clock.now()).await;
        match self
            .sessions
            .patch(&store.store_id, StorePatch::from_store(&store))
            .await
        {
            Ok(_) => report.absorb(&swept),
            Err(e) => {
                warn!(error = %e, "sweep write-back failed, skipping");
                report.stores_skipped += 1;
            }
        }
    }

    async fn load(&self, owner: &OwnerId, session: &str) -> MemoryResult<WorkingStore> {
        self.sessions
            .get(owner, session)
            .await?
            .ok_or_else(|| WorkingMemoryError::store_not_found(owner.as_str(), session))
    }

    fn visible_items(&self, store: &WorkingStore, now: DateTime<Utc>) -> Vec<Item> {
        let floor = self.config.prune_floor;
        self.decay
            .project(&store.items, store.last_update, now)
            .into_iter()
            .filter(|i| i.activation > floor)
            .collect()
    }
}

impl std::fmt::Debug for WorkingMemoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingMemoryService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_session(session: &str) -> Result<(), ValidationError> {
    if session.trim().is_empty() {
        Err(ValidationError::EmptySession)
    } else {
        Ok(())
    }
}
