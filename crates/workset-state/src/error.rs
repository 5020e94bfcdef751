//! Error types for workset-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors surfaced through the repository traits
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// No store row with this id
    #[error("store not found: {store_id}")]
    StoreNotFound { store_id: String },

    /// Compare-and-swap on the store version failed; nothing was written
    #[error("version conflict on store {store_id}: expected {expected}, found {actual}")]
    VersionConflict {
        store_id: String,
        expected: u64,
        actual: u64,
    },

    /// A stored row could not be mapped back to the model
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// Backend failure (query, connection, transport)
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}
