//! Workset-State: persistence for the working-memory engine
//!
//! This crate owns the Item/Store model and every I/O boundary of the
//! engine: the per-session store repository and the long-term memory sink.
//!
//! ## Key Components
//!
//! - `storage_traits`: model types plus the `SessionRepository` and
//!   `LongTermMemoryStore` traits
//! - `fakes`: in-memory implementations for tests
//! - `SurrealHandle`: connection management, hands out the SurrealDB-backed
//!   `SurrealSessionRepository` and `SurrealLongTermStore`

mod error;
pub mod fakes;
mod handle;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_repository;

pub use error::{StateError, StorageError};
pub use handle::{CloudConfig, SurrealHandle};
pub use storage_traits::{
    ConsolidationContext, ConsolidationRecord, Importance, Item, ItemCategory, ItemId,
    LongTermMemoryStore, MemoryType, OwnerId, Provenance, RecordId, SessionRepository,
    StorageResult, StoreId, StoreKey, StorePatch, UnknownVariant, WorkingStore,
};
pub use surreal_repository::{SurrealLongTermStore, SurrealSessionRepository};

/// Result type for workset-state connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
