//! Error types for the working-memory engine.

use workset_state::{StorageError, UnknownVariant};

use crate::config::ConfigError;

/// What a `NotFound` refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    /// The caller's subject did not resolve to a known owner.
    Owner(String),
    /// No store exists for `(owner, session)`.
    Store { owner: String, session: String },
}

impl std::fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner(subject) => write!(f, "owner {subject}"),
            Self::Store { owner, session } => write!(f, "store for {owner}/{session}"),
        }
    }
}

/// Rejected item input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("item content must not be empty")]
    EmptyContent,

    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),

    #[error("item metadata must be a JSON object")]
    MetadataNotObject,

    #[error("session identifier must not be empty")]
    EmptySession,

    #[error("store capacity must be at least 1")]
    ZeroCapacity,
}

/// Errors produced by working-memory operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkingMemoryError {
    #[error("caller is not authenticated")]
    NotAuthenticated,

    #[error("not found: {0}")]
    NotFound(NotFoundKind),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("external dependency failed: {0}")]
    ExternalDependency(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl WorkingMemoryError {
    pub fn store_not_found(owner: &str, session: &str) -> Self {
        Self::NotFound(NotFoundKind::Store {
            owner: owner.to_string(),
            session: session.to_string(),
        })
    }
}

/// Result type for working-memory operations.
pub type MemoryResult<T> = std::result::Result<T, WorkingMemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_store() {
        let err = WorkingMemoryError::store_not_found("alice", "s1");
        assert_eq!(err.to_string(), "not found: store for alice/s1");
    }

    #[test]
    fn storage_errors_convert() {
        let err: WorkingMemoryError = StorageError::Backend("down".into()).into();
        assert!(matches!(err, WorkingMemoryError::Storage(_)));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        let err: WorkingMemoryError = ValidationError::from(UnknownVariant {
            field: "category",
            value: "idea".into(),
        })
        .into();
        assert!(err.to_string().contains("unknown category"));
    }
}
