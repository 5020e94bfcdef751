//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemorySessionRepository` and `MemoryLongTermStore` that satisfy
//! the trait contracts without any external dependencies.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemorySessionRepository
// ---------------------------------------------------------------------------

/// In-memory repository backed by a `HashMap<StoreKey, WorkingStore>`.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    stores: Mutex<HashMap<StoreKey, WorkingStore>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed store, replacing any existing one for its key.
    pub fn seed(&self, store: WorkingStore) {
        let mut stores = self.stores.lock().unwrap();
        stores.insert(store.key(), store);
    }

    /// Number of persisted stores.
    pub fn len(&self) -> usize {
        self.stores.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn get(&self, owner: &OwnerId, session: &str) -> StorageResult<Option<WorkingStore>> {
        let stores = self.stores.lock().unwrap();
        let key = StoreKey {
            owner: owner.clone(),
            session: session.to_string(),
        };
        Ok(stores.get(&key).cloned())
    }

    async fn create(
        &self,
        owner: &OwnerId,
        session: &str,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> StorageResult<StoreId> {
        let mut stores = self.stores.lock().unwrap();
        let key = StoreKey {
            owner: owner.clone(),
            session: session.to_string(),
        };
        let store = stores
            .entry(key)
            .or_insert_with(|| WorkingStore::new(owner.clone(), session, capacity, now));
        Ok(store.store_id.clone())
    }

    async fn patch(&self, store_id: &StoreId, patch: StorePatch) -> StorageResult<u64> {
        let mut stores = self.stores.lock().unwrap();
        let store = stores
            .values_mut()
            .find(|s| &s.store_id == store_id)
            .ok_or_else(|| StorageError::StoreNotFound {
                store_id: store_id.0.clone(),
            })?;
        if store.version != patch.expected_version {
            return Err(StorageError::VersionConflict {
                store_id: store_id.0.clone(),
                expected: patch.expected_version,
                actual: store.version,
            });
        }
        store.items = patch.items;
        store.focus = patch.focus;
        store.last_update = patch.last_update;
        store.version += 1;
        Ok(store.version)
    }

    async fn list_keys(&self) -> StorageResult<Vec<StoreKey>> {
        let stores = self.stores.lock().unwrap();
        let mut keys: Vec<StoreKey> = stores.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// MemoryLongTermStore
// ---------------------------------------------------------------------------

/// In-memory long-term store that keeps every accepted record.
///
/// Records whose content is registered via [`MemoryLongTermStore::fail_on`]
/// are rejected with a backend error, for exercising partial failure.
#[derive(Debug, Default)]
pub struct MemoryLongTermStore {
    records: Mutex<Vec<(RecordId, ConsolidationRecord)>>,
    failing_content: Mutex<HashSet<String>>,
    attempts: Mutex<usize>,
}

impl MemoryLongTermStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any future record whose content equals `content`.
    pub fn fail_on(&self, content: &str) {
        self.failing_content
            .lock()
            .unwrap()
            .insert(content.to_string());
    }

    /// Accepted records, in arrival order.
    pub fn records(&self) -> Vec<ConsolidationRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Number of `store` calls, accepted or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl LongTermMemoryStore for MemoryLongTermStore {
    async fn store(&self, record: ConsolidationRecord) -> StorageResult<RecordId> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing_content.lock().unwrap().contains(&record.content) {
            return Err(StorageError::Backend(format!(
                "long-term store rejected record: {}",
                record.summary
            )));
        }
        let id = RecordId(uuid::Uuid::new_v4().to_string());
        self.records.lock().unwrap().push((id.clone(), record));
        Ok(id)
    }
}
