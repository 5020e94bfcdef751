//! Storage trait definitions for Workset
//!
//! These traits define the two persistence seams of the engine:
//! - `SessionRepository`: one working store per `(owner, session)`, rewritten
//!   wholesale on every mutation and guarded by an optimistic version stamp
//! - `LongTermMemoryStore`: durable sink for consolidated items
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Resolved identity of the user owning a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        OwnerId(s.to_string())
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a persisted working store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(pub String);

impl StoreId {
    /// Generate a new random StoreId
    pub fn new() -> Self {
        StoreId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an item, stable and unique within its store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Generate a new random ItemId
    pub fn new() -> Self {
        ItemId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier returned by the long-term store for a consolidated record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Item model
// ---------------------------------------------------------------------------

/// A string did not name any variant of a fixed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field}: {value:?}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

/// Semantic category of a working-memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Concept,
    Entity,
    Task,
    Preference,
    Context,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Entity => "entity",
            Self::Task => "task",
            Self::Preference => "preference",
            Self::Context => "context",
        }
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concept" => Ok(Self::Concept),
            "entity" => Ok(Self::Entity),
            "task" => Ok(Self::Task),
            "preference" => Ok(Self::Preference),
            "context" => Ok(Self::Context),
            _ => Err(UnknownVariant {
                field: "category",
                value: s.to_string(),
            }),
        }
    }
}

/// Where an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    Chat,
    Memory,
    Inference,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Memory => "memory",
            Self::Inference => "inference",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provenance {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "memory" => Ok(Self::Memory),
            "inference" => Ok(Self::Inference),
            _ => Err(UnknownVariant {
                field: "provenance",
                value: s.to_string(),
            }),
        }
    }
}

/// A single item held in working memory.
///
/// Invariants: `0.0 <= activation <= 1.0` and `access_count >= 1`.
/// `associations` are directed edges to other items of the same store and
/// may dangle once the target has been evicted or pruned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub content: String,
    pub category: ItemCategory,
    pub activation: f64,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    #[serde(default)]
    pub associations: Vec<ItemId>,
    pub provenance: Provenance,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::json!({})
}

impl Item {
    /// Whether this item already carries an edge to `target`.
    pub fn is_linked_to(&self, target: &ItemId) -> bool {
        self.associations.iter().any(|a| a == target)
    }
}

// ---------------------------------------------------------------------------
// Working store
// ---------------------------------------------------------------------------

/// `(owner, session)` pair a store is indexed by
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
    pub owner: OwnerId,
    pub session: String,
}

/// Full working store as persisted by a [`SessionRepository`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingStore {
    pub store_id: StoreId,
    pub owner: OwnerId,
    pub session: String,
    /// Insertion order is kept as the deterministic tie-break
    pub items: Vec<Item>,
    pub capacity: usize,
    pub focus: Option<ItemId>,
    /// Anchor for every decay projection
    pub last_update: DateTime<Utc>,
    /// Optimistic concurrency stamp, bumped by every successful patch
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl WorkingStore {
    /// A fresh, empty store at version 0.
    pub fn new(owner: OwnerId, session: &str, capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            store_id: StoreId::new(),
            owner,
            session: session.to_string(),
            items: Vec::new(),
            capacity,
            focus: None,
            last_update: now,
            version: 0,
            created_at: now,
        }
    }

    pub fn key(&self) -> StoreKey {
        StoreKey {
            owner: self.owner.clone(),
            session: self.session.clone(),
        }
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|i| &i.id == id)
    }
}

/// Whole-array rewrite of a store's mutable fields.
///
/// Applied only if the stored version still equals `expected_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePatch {
    pub items: Vec<Item>,
    pub focus: Option<ItemId>,
    pub last_update: DateTime<Utc>,
    pub expected_version: u64,
}

impl StorePatch {
    /// Patch that writes back the mutable fields of `store`.
    pub fn from_store(store: &WorkingStore) -> Self {
        Self {
            items: store.items.clone(),
            focus: store.focus.clone(),
            last_update: store.last_update,
            expected_version: store.version,
        }
    }
}

/// Working-store repository.
///
/// Guarantees:
/// - At most one store exists per `(owner, session)`.
/// - `create` is upsert-safe: racing creators all receive the same id.
/// - `patch` is all-or-nothing and compares-and-swaps on `version`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Fetch the store for `(owner, session)`, if any.
    async fn get(&self, owner: &OwnerId, session: &str) -> StorageResult<Option<WorkingStore>>;

    /// Create an empty store, or return the id of the existing one.
    async fn create(
        &self,
        owner: &OwnerId,
        session: &str,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> StorageResult<StoreId>;

    /// Rewrite `items`, `focus` and `last_update`. Returns the new version.
    async fn patch(&self, store_id: &StoreId, patch: StorePatch) -> StorageResult<u64>;

    /// Every `(owner, session)` with a persisted store.
    async fn list_keys(&self) -> StorageResult<Vec<StoreKey>>;
}

// ---------------------------------------------------------------------------
// LongTermMemoryStore
// ---------------------------------------------------------------------------

/// Long-term memory type an item category is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    DomainKnowledge,
    EntityRelation,
    TaskHistory,
    UserPreference,
    ConversationContext,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainKnowledge => "domain_knowledge",
            Self::EntityRelation => "entity_relation",
            Self::TaskHistory => "task_history",
            Self::UserPreference => "user_preference",
            Self::ConversationContext => "conversation_context",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    High,
    Medium,
}

/// Working-memory context carried along with a consolidated record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationContext {
    pub session: String,
    pub access_count: u32,
    pub final_activation: f64,
    pub associations: Vec<ItemId>,
}

/// Record handed to the long-term store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationRecord {
    pub memory_type: MemoryType,
    pub content: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub context: ConsolidationContext,
    pub importance: Importance,
    pub confidence: f64,
    pub source: String,
}

/// Durable long-term memory sink.
///
/// Callers treat it as fire-and-forget: errors are logged, never propagated.
#[async_trait]
pub trait LongTermMemoryStore: Send + Sync {
    async fn store(&self, record: ConsolidationRecord) -> StorageResult<RecordId>;
}
