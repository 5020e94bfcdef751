//! Validated input for adding an item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workset_state::{Item, ItemCategory, ItemId, Provenance};

use super::error::ValidationError;

/// Caller-supplied description of a new item.
///
/// `category` and `provenance` arrive as strings from outer surfaces and are
/// parsed against the fixed enums by [`ItemSpec::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub provenance: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl ItemSpec {
    pub fn new(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category: category.into(),
            provenance: None,
            metadata: None,
        }
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn validate(&self) -> Result<ValidItemSpec, ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        let category: ItemCategory = self.category.parse()?;
        let provenance = match &self.provenance {
            Some(p) => p.parse()?,
            None => Provenance::default(),
        };
        let metadata = match &self.metadata {
            None => serde_json::json!({}),
            Some(v) if v.is_object() => v.clone(),
            Some(_) => return Err(ValidationError::MetadataNotObject),
        };
        Ok(ValidItemSpec {
            content: self.content.clone(),
            category,
            provenance,
            metadata,
        })
    }
}

/// An [`ItemSpec`] that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidItemSpec {
    pub content: String,
    pub category: ItemCategory,
    pub provenance: Provenance,
    pub metadata: serde_json::Value,
}

impl ValidItemSpec {
    /// Fresh item: full activation, one access, no associations.
    pub fn into_item(self, now: DateTime<Utc>) -> Item {
        Item {
            id: ItemId::new(),
            content: self.content,
            category: self.category,
            activation: 1.0,
            last_accessed: now,
            access_count: 1,
            associations: Vec::new(),
            provenance: self.provenance,
            metadata: self.metadata,
            created_at: now,
        }
    }
}
