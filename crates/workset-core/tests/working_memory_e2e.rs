//! End-to-end tests for the working-memory service over the in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use workset_core::{
    Caller, Clock, EngineConfig, ItemSpec, ManualClock, NotFoundKind, StaticIdentityResolver,
    WorkingMemoryError, WorkingMemoryService,
};
use workset_state::fakes::{MemoryLongTermStore, MemorySessionRepository};
use workset_state::{
    Importance, Item, ItemCategory, ItemId, MemoryType, OwnerId, Provenance, SessionRepository,
    StorageError, StorageResult, StoreId, StoreKey, StorePatch, WorkingStore,
};

struct Harness {
    repo: Arc<MemorySessionRepository>,
    long_term: Arc<MemoryLongTermStore>,
    clock: ManualClock,
    svc: WorkingMemoryService,
}

fn harness() -> Harness {
    let repo = Arc::new(MemorySessionRepository::new());
    let long_term = Arc::new(MemoryLongTermStore::new());
    let clock = ManualClock::default();
    let svc = WorkingMemoryService::with_clock(
        repo.clone(),
        long_term.clone(),
        Arc::new(StaticIdentityResolver::new(["alice", "bob"])),
        Arc::new(clock.clone()),
        EngineConfig::default(),
    );
    Harness {
        repo,
        long_term,
        clock,
        svc,
    }
}

fn alice() -> Caller {
    Caller::new("alice")
}

fn seeded_item(id: &str, content: &str, activation: f64, access_count: u32, at: DateTime<Utc>) -> Item {
    Item {
        id: ItemId::from(id),
        content: content.into(),
        category: ItemCategory::Concept,
        activation,
        last_accessed: at,
        access_count,
        associations: Vec::new(),
        provenance: Provenance::Chat,
        metadata: serde_json::json!({}),
        created_at: at,
    }
}

async fn stored(repo: &MemorySessionRepository, owner: &str, session: &str) -> WorkingStore {
    repo.get(&OwnerId::from(owner), session)
        .await
        .unwrap()
        .expect("store should exist")
}

// ---------------------------------------------------------------------------
// Initialize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let h = harness();
    let first = h.svc.initialize(&alice(), "s1", Some(5)).await.unwrap();
    let second = h.svc.initialize(&alice(), "s1", Some(9)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.repo.len(), 1);
    assert_eq!(stored(&h.repo, "alice", "s1").await.capacity, 5);
}

#[tokio::test]
async fn test_initialize_defaults_capacity() {
    let h = harness();
    h.svc.initialize(&alice(), "s1", None).await.unwrap();
    let store = stored(&h.repo, "alice", "s1").await;
    assert_eq!(store.capacity, 7);
    assert!(store.items.is_empty());
    assert_eq!(store.last_update, h.clock.now());
}

#[tokio::test]
async fn test_owners_are_isolated() {
    let h = harness();
    h.svc.initialize(&alice(), "shared", None).await.unwrap();
    h.svc
        .add_item(&alice(), "shared", ItemSpec::new("alice secret", "context"))
        .await
        .unwrap();

    let bob = Caller::new("bob");
    assert!(h.svc.get_state(&bob, "shared", false).await.unwrap().is_none());
    let err = h
        .svc
        .add_item(&bob, "shared", ItemSpec::new("x", "task"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkingMemoryError::NotFound(NotFoundKind::Store { .. })));
}

// ---------------------------------------------------------------------------
// Identity and lifecycle errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_identity_failures() {
    let h = harness();
    let err = h
        .svc
        .initialize(&Caller::anonymous(), "s1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkingMemoryError::NotAuthenticated));

    let err = h
        .svc
        .initialize(&Caller::new("mallory"), "s1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkingMemoryError::NotFound(NotFoundKind::Owner(_))));
    assert!(h.repo.is_empty());
}

#[tokio::test]
async fn test_uninitialized_store() {
    let h = harness();
    let err = h
        .svc
        .add_item(&alice(), "nope", ItemSpec::new("x", "task"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkingMemoryError::NotFound(NotFoundKind::Store { .. })));

    let err = h
        .svc
        .focus_item(&alice(), "nope", &ItemId::from("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkingMemoryError::NotFound(NotFoundKind::Store { .. })));

    assert!(h.svc.get_state(&alice(), "nope", true).await.unwrap().is_none());
    assert!(h.svc.graph_view(&alice(), "nope").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// AddItem
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_add_item_sets_focus_and_defaults() {
    let h = harness();
    h.svc.initialize(&alice(), "s1", None).await.unwrap();
    let id = h
        .svc
        .add_item(
            &alice(),
            "s1",
            ItemSpec::new("Paris is in France", "Entity")
                .with_provenance("memory")
                .with_metadata(serde_json::json!({"turn": 3})),
        )
        .await
        .unwrap();

    let store = stored(&h.repo, "alice", "s1").await;
    assert_eq!(store.focus, Some(id.clone()));
    assert_eq!(store.version, 1);
    let item = store.item(&id).unwrap();
    assert_eq!(item.activation, 1.0);
    assert_eq!(item.access_count, 1);
    assert_eq!(item.category, ItemCategory::Entity);
    assert_eq!(item.provenance, Provenance::Memory);
    assert_eq!(item.metadata["turn"], 3);
}

#[tokio::test]
async fn test_capacity_overflow_evicts_and_consolidates() {
    let h = harness();
    h.svc.initialize(&alice(), "s1", Some(3)).await.unwrap();

    let mut ids = Vec::new();
    for content in ["alpha one", "bravo two", "charlie three", "delta four"] {
        ids.push(
            h.svc
                .add_item(&alice(), "s1", ItemSpec::new(content, "task"))
                .await
                .unwrap(),
        );
        h.clock.advance(Duration::milliseconds(1));
    }

    let store = stored(&h.repo, "alice", "s1").await;
    let kept: Vec<&ItemId> = store.items.iter().map(|i| &i.id).collect();
    assert_eq!(kept, vec![&ids[1], &ids[2], &ids[3]]);
    assert_eq!(store.focus, Some(ids[3].clone()));

    // the displaced item was still near full activation
    let records = h.long_term.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "alpha one");
    assert_eq!(records[0].memory_type, MemoryType::TaskHistory);
    assert_eq!(records[0].importance, Importance::High);
}

#[tokio::test]
async fn test_simultaneous_adds_always_keep_the_newest() {
    let h = harness();
    h.svc.initialize(&alice(), "s1", Some(3)).await.unwrap();

    // no clock movement, so every eviction score is an exact tie
    let mut ids = Vec::new();
    for content in ["alpha one", "bravo two", "charlie three", "delta four"] {
        ids.push(
            h.svc
                .add_item(&alice(), "s1", ItemSpec::new(content, "task"))
                .await
                .unwrap(),
        );
    }

    let store = stored(&h.repo, "alice", "s1").await;
    let kept: Vec<&ItemId> = store.items.iter().map(|i| &i.id).collect();
    assert_eq!(kept, vec![&ids[0], &ids[1], &ids[3]]);
    assert_eq!(store.focus, Some(ids[3].clone()));

    let records = h.long_term.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "charlie three");

    let view = h.svc.get_state(&alice(), "s1", false).await.unwrap().unwrap();
    assert!(view.items.iter().any(|i| i.id == ids[3]));
}

#[tokio::test]
async fn test_faded_displaced_item_is_not_consolidated() {
    let h = harness();
    h.svc.initialize(&alice(), "s1", Some(2)).await.unwrap();
    h.svc
        .add_item(&alice(), "s1", ItemSpec::new("old news", "context"))
        .await
        .unwrap();
    h.clock.advance_minutes(8);
    h.svc
        .add_item(&alice(), "s1", ItemSpec::new("newer", "concept"))
        .await
        .unwrap();
    h.clock.advance(Duration::milliseconds(1));
    h.svc
        .add_item(&alice(), "s1", ItemSpec::new("newest", "entity"))
        .await
        .unwrap();

    let store = stored(&h.repo, "alice", "s1").await;
    assert_eq!(store.items.len(), 2);
    assert!(store.items.iter().all(|i| i.content != "old news"));
    assert_eq!(h.long_term.attempts(), 0);
}

#[tokio::test]
async fn test_new_items_link_from_related_items() {
    let h = harness();
    h.svc.initialize(&alice(), "s1", None).await.unwrap();
    let report = h
        .svc
        .add_item(&alice(), "s1", ItemSpec::new("write the quarterly report", "task"))
        .await
        .unwrap();
    let tea = h
        .svc
        .add_item(&alice(), "s1", ItemSpec::new("likes green tea", "preference"))
        .await
        .unwrap();
    let review = h
        .svc
        .add_item(&alice(), "s1", ItemSpec::new("review quarterly report", "entity"))
        .await
        .unwrap();

    let store = stored(&h.repo, "alice", "s1").await;
    assert_eq!(store.item(&report).unwrap().associations, vec![review.clone()]);
    assert!(store.item(&tea).unwrap().associations.is_empty());
    assert!(store.item(&review).unwrap().associations.is_empty());

    let graph = h.svc.graph_view(&alice(), "s1").await.unwrap().unwrap();
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].source, report);
    assert_eq!(graph.edges[0].target, review);
}

// ---------------------------------------------------------------------------
// GetState
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_state_decays_without_persisting() {
    let h = harness();
    h.svc.initialize(&alice(), "s1", None).await.unwrap();
    let id = h
        .svc
        .add_item(&alice(), "s1", ItemSpec::new("fact", "concept"))
        .await
        .unwrap();
    let before = stored(&h.repo, "alice", "s1").await;

    h.clock.advance_minutes(5);
    let view = h.svc.get_state(&alice(), "s1", false).await.unwrap().unwrap();
    assert!((view.items[0].activation - 0.5347).abs() < 1e-3);
    assert!(view.graph.is_none());
    assert_eq!(view.focus, Some(id));

    // reading twice gives the same answer and writes nothing
    let again = h.svc.get_state(&alice(), "s1", false).await.unwrap().unwrap();
    assert_eq!(again.items, view.items);
    let after = stored(&h.repo, "alice", "s1").await;
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_get_state_hides_faded_items() {
    let h = harness();
    let now = h.clock.now();
    let mut store = WorkingStore::new(OwnerId::from("alice"), "s1", 7, now);
    store.items = vec![
        seeded_item("dim", "dim", 0.1, 1, now),
        seeded_item("lit", "lit", 0.6, 1, now),
    ];
    h.repo.seed(store);

    let view = h.svc.get_state(&alice(), "s1", true).await.unwrap().unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, ItemId::from("lit"));
    assert_eq!(view.graph.unwrap().nodes.len(), 1);
    assert_eq!(stored(&h.repo, "alice", "s1").await.items.len(), 2);
}

// ---------------------------------------------------------------------------
// FocusItem
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_focus_boosts_target_and_associates() {
    let h = harness();
    let now = h.clock.now();
    let mut target = seeded_item("t", "target", 0.8, 1, now);
    target.associations = vec![ItemId::from("a")];
    let mut store = WorkingStore::new(OwnerId::from("alice"), "s1", 7, now);
    store.items = vec![
        target,
        seeded_item("a", "associate", 0.4, 2, now - Duration::minutes(1)),
        seeded_item("x", "bystander", 0.5, 1, now),
    ];
    h.repo.seed(store);

    h.clock.advance(Duration::seconds(1));
    let out = h
        .svc
        .focus_item(&alice(), "s1", &ItemId::from("t"))
        .await
        .unwrap();
    assert!(out.found);
    assert_eq!(out.boosted, vec![ItemId::from("a")]);

    let store = stored(&h.repo, "alice", "s1").await;
    let t = store.item(&ItemId::from("t")).unwrap();
    let a = store.item(&ItemId::from("a")).unwrap();
    let x = store.item(&ItemId::from("x")).unwrap();
    assert_eq!(t.activation, 1.0);
    assert_eq!(t.access_count, 2);
    assert_eq!(t.last_accessed, h.clock.now());
    assert!((a.activation - 0.6).abs() < 0.01);
    assert_eq!(a.access_count, 2);
    assert_eq!(a.last_accessed, now - Duration::minutes(1));
    assert!(x.activation < 0.5);
    assert_eq!(store.focus, Some(ItemId::from("t")));
    assert_eq!(store.last_update, h.clock.now());
}

// ---------------------------------------------------------------------------
// ConsolidateSession
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_partial_consolidation_failure() {
    let h = harness();
    let now = h.clock.now();
    let mut store = WorkingStore::new(OwnerId::from("alice"), "s1", 7, now);
    store.items = vec![
        seeded_item("1", "first strong", 0.9, 1, now),
        seeded_item("2", "second strong", 0.95, 1, now),
        seeded_item("3", "often used", 0.3, 6, now),
        seeded_item("4", "forgotten", 0.05, 1, now),
    ];
    h.repo.seed(store);
    h.long_term.fail_on("second strong");

    let report = h.svc.consolidate_session(&alice(), "s1").await;
    assert_eq!(report.stores_swept, 1);
    assert_eq!(report.consolidated, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pruned, 1);
    assert_eq!(h.long_term.attempts(), 3);

    let store = stored(&h.repo, "alice", "s1").await;
    let ids: Vec<&str> = store.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_consolidation_is_scoped_to_caller() {
    let h = harness();
    let bob = Caller::new("bob");
    for caller in [&alice(), &bob] {
        h.svc.initialize(caller, "s1", None).await.unwrap();
        h.svc
            .add_item(caller, "s1", ItemSpec::new("keep me", "concept"))
            .await
            .unwrap();
    }

    let report = h.svc.consolidate_session(&bob, "s1").await;
    assert_eq!(report.stores_swept, 1);
    assert_eq!(h.long_term.records().len(), 1);
    assert_eq!(stored(&h.repo, "alice", "s1").await.version, 1);
    assert_eq!(stored(&h.repo, "bob", "s1").await.version, 2);
}

#[tokio::test]
async fn test_consolidation_never_fails() {
    let h = harness();
    let report = h.svc.consolidate_session(&Caller::anonymous(), "s1").await;
    assert_eq!(report, Default::default());
    let report = h.svc.consolidate_session(&alice(), "missing").await;
    assert_eq!(report.stores_swept, 0);
}

// ---------------------------------------------------------------------------
// Concurrent writers
// ---------------------------------------------------------------------------

/// Repository that lets another writer slip in between every read and write.
struct RacingRepository {
    inner: MemorySessionRepository,
}

#[async_trait]
impl SessionRepository for RacingRepository {
    async fn get(&self, owner: &OwnerId, session: &str) -> StorageResult<Option<WorkingStore>> {
        let found = self.inner.get(owner, session).await?;
        if let Some(store) = &found {
            self.inner
                .patch(&store.store_id, StorePatch::from_store(store))
                .await?;
        }
        Ok(found)
    }

    async fn create(
        &self,
        owner: &OwnerId,
        session: &str,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> StorageResult<StoreId> {
        self.inner.create(owner, session, capacity, now).await
    }

    async fn patch(&self, store_id: &StoreId, patch: StorePatch) -> StorageResult<u64> {
        self.inner.patch(store_id, patch).await
    }

    async fn list_keys(&self) -> StorageResult<Vec<StoreKey>> {
        self.inner.list_keys().await
    }
}

#[tokio::test]
async fn test_lost_update_is_rejected() {
    let repo = Arc::new(RacingRepository {
        inner: MemorySessionRepository::new(),
    });
    let svc = WorkingMemoryService::with_clock(
        repo.clone(),
        Arc::new(MemoryLongTermStore::new()),
        Arc::new(StaticIdentityResolver::new(["alice"])),
        Arc::new(ManualClock::default()),
        EngineConfig::default(),
    );
    svc.initialize(&alice(), "s1", None).await.unwrap();

    let err = svc
        .add_item(&alice(), "s1", ItemSpec::new("x", "task"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkingMemoryError::Storage(StorageError::VersionConflict { .. })
    ));

    let report = svc.sweep_all().await;
    assert_eq!(report.stores_swept, 0);
    assert_eq!(report.stores_skipped, 1);
}

#[tokio::test]
async fn test_conflicting_add_consolidates_nothing() {
    let repo = Arc::new(RacingRepository {
        inner: MemorySessionRepository::new(),
    });
    let long_term = Arc::new(MemoryLongTermStore::new());
    let clock = ManualClock::default();
    let svc = WorkingMemoryService::with_clock(
        repo.clone(),
        long_term.clone(),
        Arc::new(StaticIdentityResolver::new(["alice"])),
        Arc::new(clock.clone()),
        EngineConfig::default(),
    );
    svc.initialize(&alice(), "s1", Some(1)).await.unwrap();

    let mut full = stored(&repo.inner, "alice", "s1").await;
    full.items = vec![seeded_item("resident", "still important", 0.9, 1, clock.now())];
    repo.inner
        .patch(&full.store_id, StorePatch::from_store(&full))
        .await
        .unwrap();

    let err = svc
        .add_item(&alice(), "s1", ItemSpec::new("newcomer", "task"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkingMemoryError::Storage(StorageError::VersionConflict { .. })
    ));

    assert_eq!(long_term.attempts(), 0);
    let store = stored(&repo.inner, "alice", "s1").await;
    assert_eq!(store.items.len(), 1);
    assert_eq!(store.items[0].id, ItemId::from("resident"));
}
