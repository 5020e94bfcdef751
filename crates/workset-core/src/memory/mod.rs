//! Working-memory engine.
//!
//! Pure, clock-parameterised components that operate on a [`WorkingStore`]:
//! decay, capacity eviction, association linking, rehearsal and
//! consolidation. None of them touch persistence except the consolidation
//! gateway, which writes through a `LongTermMemoryStore`.
//!
//! [`WorkingStore`]: workset_state::WorkingStore

pub mod association;
pub mod attention;
pub mod consolidation;
pub mod decay;
pub mod error;
pub mod eviction;
pub mod item;

pub use association::{
    build_graph_view, lexical_overlap, link_new_item, GraphEdge, GraphNode, GraphView,
};
pub use attention::{AttentionController, FocusOutcome};
pub use consolidation::{map_category, ConsolidationGateway, SweepReport};
pub use decay::DecayEngine;
pub use error::{MemoryResult, NotFoundKind, ValidationError, WorkingMemoryError};
pub use eviction::{admit, enforce_capacity, eviction_score, EvictionOutcome};
pub use item::{ItemSpec, ValidItemSpec};
