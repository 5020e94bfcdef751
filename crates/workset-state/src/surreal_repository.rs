//! SurrealDB-backed SessionRepository and LongTermMemoryStore
//!
//! Uses the row types in `schema`, converting to/from `storage_traits`
//! types at the boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use surrealdb::engine::any::Any;
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::schema::{ItemRow, LongTermMemoryRow, StoreKeyRow, StoreRow};
use crate::storage_traits::{
    ConsolidationRecord, LongTermMemoryStore, OwnerId, RecordId, SessionRepository, StorageResult,
    StoreId, StoreKey, StorePatch, WorkingStore,
};

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

// ---------------------------------------------------------------------------
// SurrealSessionRepository
// ---------------------------------------------------------------------------

/// SurrealDB-backed implementation of [`SessionRepository`].
#[derive(Clone)]
pub struct SurrealSessionRepository {
    db: Surreal<Any>,
}

impl SurrealSessionRepository {
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    async fn fetch_by_key(&self, owner: &str, session: &str) -> StorageResult<Option<StoreRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM working_stores WHERE owner = $owner AND session = $session_name")
            .bind(("owner", owner.to_string()))
            .bind(("session_name", session.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<StoreRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_by_id(&self, store_id: &str) -> StorageResult<Option<StoreRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM working_stores WHERE store_id = $sid")
            .bind(("sid", store_id.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<StoreRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl SessionRepository for SurrealSessionRepository {
    async fn get(&self, owner: &OwnerId, session: &str) -> StorageResult<Option<WorkingStore>> {
        self.fetch_by_key(owner.as_str(), session)
            .await?
            .map(StoreRow::into_store)
            .transpose()
    }

    async fn create(
        &self,
        owner: &OwnerId,
        session: &str,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> StorageResult<StoreId> {
        if let Some(existing) = self.fetch_by_key(owner.as_str(), session).await? {
            return Ok(StoreId(existing.store_id));
        }

        let row = StoreRow::new(owner, session, capacity, now);
        let store_id = StoreId(row.store_id.clone());
        debug!(store_id = %store_id, owner = %owner, session = %session, "creating store");

        let created: Result<Option<StoreRow>, surrealdb::Error> =
            self.db.create("working_stores").content(row).await;

        match created {
            Ok(_) => Ok(store_id),
            Err(e) => {
                // Lost a creation race on the (owner, session) unique index
                match self.fetch_by_key(owner.as_str(), session).await? {
                    Some(winner) => {
                        debug!(store_id = %winner.store_id, "store created concurrently");
                        Ok(StoreId(winner.store_id))
                    }
                    None => Err(backend(e)),
                }
            }
        }
    }

    async fn patch(&self, store_id: &StoreId, patch: StorePatch) -> StorageResult<u64> {
        let items: Vec<ItemRow> = patch.items.iter().map(ItemRow::from).collect();
        let focus = patch.focus.map(|f| f.0);
        let expected = patch.expected_version;

        let mut res = self
            .db
            .query(
                "UPDATE working_stores SET items = $items, focus = $focus, \
                 last_update = $last_update, version = version + 1 \
                 WHERE store_id = $sid AND version = $expected RETURN AFTER",
            )
            .bind(("items", items))
            .bind(("focus", focus))
            .bind(("last_update", SurrealDatetime::from(patch.last_update)))
            .bind(("sid", store_id.0.clone()))
            .bind(("expected", expected))
            .await
            .map_err(backend)?;

        let updated: Vec<StoreRow> = res.take(0).map_err(backend)?;
        if let Some(row) = updated.into_iter().next() {
            return Ok(row.version);
        }

        match self.fetch_by_id(&store_id.0).await? {
            Some(current) => {
                warn!(
                    store_id = %store_id,
                    expected,
                    actual = current.version,
                    "store patch lost a version race"
                );
                Err(StorageError::VersionConflict {
                    store_id: store_id.0.clone(),
                    expected,
                    actual: current.version,
                })
            }
            None => Err(StorageError::StoreNotFound {
                store_id: store_id.0.clone(),
            }),
        }
    }

    async fn list_keys(&self) -> StorageResult<Vec<StoreKey>> {
        let mut res = self
            .db
            .query("SELECT owner, session FROM working_stores ORDER BY owner, session")
            .await
            .map_err(backend)?;

        let rows: Vec<StoreKeyRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().map(StoreKey::from).collect())
    }
}

// ---------------------------------------------------------------------------
// SurrealLongTermStore
// ---------------------------------------------------------------------------

/// SurrealDB-backed implementation of [`LongTermMemoryStore`].
#[derive(Clone)]
pub struct SurrealLongTermStore {
    db: Surreal<Any>,
}

impl SurrealLongTermStore {
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Number of stored records for a memory type (inspection helper)
    pub async fn count_by_type(&self, memory_type: &str) -> StorageResult<usize> {
        let mut res = self
            .db
            .query("SELECT record_id FROM long_term_memories WHERE memory_type = $mt")
            .bind(("mt", memory_type.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<serde_json::Value> = res.take(0).map_err(backend)?;
        Ok(rows.len())
    }
}

#[async_trait]
impl LongTermMemoryStore for SurrealLongTermStore {
    async fn store(&self, record: ConsolidationRecord) -> StorageResult<RecordId> {
        let row = LongTermMemoryRow::new(&record)?;
        let record_id = RecordId(row.record_id.clone());

        debug!(record_id = %record_id, memory_type = %row.memory_type, "storing long-term memory");

        let _created: Option<LongTermMemoryRow> = self
            .db
            .create("long_term_memories")
            .content(row)
            .await
            .map_err(backend)?;

        Ok(record_id)
    }
}
