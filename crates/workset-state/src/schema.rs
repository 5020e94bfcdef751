//! Row definitions for the Workset SurrealDB tables
//!
//! Tables:
//! - working_stores: one row per `(owner, session)`, items embedded
//! - long_term_memories: consolidated records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{
    ConsolidationRecord, Item, ItemCategory, ItemId, OwnerId, Provenance, StoreId, StoreKey,
    WorkingStore,
};

/// Module for serializing chrono DateTime to SurrealDB datetime format
pub(crate) mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Item as embedded in a `working_stores` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRow {
    pub item_id: String,
    pub content: String,
    pub category: ItemCategory,
    pub activation: f64,
    #[serde(with = "surreal_datetime")]
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    #[serde(default)]
    pub associations: Vec<String>,
    pub provenance: Provenance,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        ItemRow {
            item_id: item.id.0.clone(),
            content: item.content.clone(),
            category: item.category,
            activation: item.activation,
            last_accessed: item.last_accessed,
            access_count: item.access_count,
            associations: item.associations.iter().map(|a| a.0.clone()).collect(),
            provenance: item.provenance,
            metadata: item.metadata.clone(),
            created_at: item.created_at,
        }
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        let metadata = if row.metadata.is_null() {
            serde_json::json!({})
        } else {
            row.metadata
        };
        Item {
            id: ItemId(row.item_id),
            content: row.content,
            category: row.category,
            activation: row.activation,
            last_accessed: row.last_accessed,
            access_count: row.access_count,
            associations: row.associations.into_iter().map(ItemId).collect(),
            provenance: row.provenance,
            metadata,
            created_at: row.created_at,
        }
    }
}

/// Row of the `working_stores` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing)]
    pub id: Option<surrealdb::sql::Thing>,
    pub store_id: String,
    pub owner: String,
    pub session: String,
    #[serde(default)]
    pub items: Vec<ItemRow>,
    pub capacity: u64,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub last_update: DateTime<Utc>,
    pub version: u64,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl StoreRow {
    /// Row for a brand-new empty store
    pub fn new(owner: &OwnerId, session: &str, capacity: usize, now: DateTime<Utc>) -> Self {
        StoreRow {
            id: None,
            store_id: StoreId::new().0,
            owner: owner.0.clone(),
            session: session.to_string(),
            items: Vec::new(),
            capacity: capacity as u64,
            focus: None,
            last_update: now,
            version: 0,
            created_at: now,
        }
    }

    pub fn into_store(self) -> Result<WorkingStore, StorageError> {
        let capacity = usize::try_from(self.capacity)
            .map_err(|_| StorageError::CorruptRow(format!("capacity {}", self.capacity)))?;
        if capacity == 0 {
            return Err(StorageError::CorruptRow(format!(
                "store {} has zero capacity",
                self.store_id
            )));
        }
        Ok(WorkingStore {
            store_id: StoreId(self.store_id),
            owner: OwnerId(self.owner),
            session: self.session,
            items: self.items.into_iter().map(Item::from).collect(),
            capacity,
            focus: self.focus.map(ItemId),
            last_update: self.last_update,
            version: self.version,
            created_at: self.created_at,
        })
    }
}

/// Projection used by `list_keys`
#[derive(Debug, Clone, Deserialize)]
pub struct StoreKeyRow {
    pub owner: String,
    pub session: String,
}

impl From<StoreKeyRow> for StoreKey {
    fn from(row: StoreKeyRow) -> Self {
        StoreKey {
            owner: OwnerId(row.owner),
            session: row.session,
        }
    }
}

/// Row of the `long_term_memories` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermMemoryRow {
    pub record_id: String,
    pub memory_type: String,
    pub content: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub context: serde_json::Value,
    pub importance: String,
    pub confidence: f64,
    pub source: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl LongTermMemoryRow {
    pub fn new(record: &ConsolidationRecord) -> Result<Self, StorageError> {
        let context = serde_json::to_value(&record.context)
            .map_err(|e| StorageError::Backend(format!("context serialization: {e}")))?;
        let importance = serde_json::to_value(record.importance)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "medium".to_string());
        Ok(LongTermMemoryRow {
            record_id: uuid::Uuid::new_v4().to_string(),
            memory_type: record.memory_type.as_str().to_string(),
            content: record.content.clone(),
            summary: record.summary.clone(),
            keywords: record.keywords.clone(),
            context,
            importance,
            confidence: record.confidence,
            source: record.source.clone(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_traits::{ConsolidationContext, Importance, MemoryType};

    #[test]
    fn item_row_round_trip_keeps_associations() {
        let now = Utc::now();
        let item = Item {
            id: ItemId::from("a"),
            content: "rust ownership".into(),
            category: ItemCategory::Concept,
            activation: 0.75,
            last_accessed: now,
            access_count: 3,
            associations: vec![ItemId::from("b"), ItemId::from("c")],
            provenance: Provenance::Inference,
            metadata: serde_json::json!({"k": "v"}),
            created_at: now,
        };
        let back = Item::from(ItemRow::from(&item));
        assert_eq!(back, item);
    }

    #[test]
    fn zero_capacity_row_is_corrupt() {
        let mut row = StoreRow::new(&OwnerId::from("u"), "s", 7, Utc::now());
        row.capacity = 0;
        assert!(matches!(row.into_store(), Err(StorageError::CorruptRow(_))));
    }

    #[test]
    fn long_term_row_flattens_enums() {
        let record = ConsolidationRecord {
            memory_type: MemoryType::TaskHistory,
            content: "ship it".into(),
            summary: "Consolidated from working memory: ship it".into(),
            keywords: vec!["ship".into(), "it".into()],
            context: ConsolidationContext {
                session: "s".into(),
                access_count: 4,
                final_activation: 0.9,
                associations: vec![],
            },
            importance: Importance::High,
            confidence: 0.9,
            source: "working_memory_consolidation".into(),
        };
        let row = LongTermMemoryRow::new(&record).unwrap();
        assert_eq!(row.memory_type, "task_history");
        assert_eq!(row.importance, "high");
        assert_eq!(row.context["access_count"], 4);
    }
}
