//! Workset Core Library
//!
//! A bounded, decaying working memory for conversational agents. Items enter
//! a per-session store, lose activation over time, get rehearsed when
//! focused, are displaced when the store is full, and are promoted into
//! long-term memory when they prove important.
//!
//! [`WorkingMemoryService`] is the entry point; the pieces it composes live
//! under [`memory`].

pub mod clock;
pub mod config;
pub mod identity;
pub mod memory;
pub mod metrics;
pub mod obs;
pub mod orchestration;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use identity::{Caller, IdentityResolver, StaticIdentityResolver, TrustedIdentityResolver};
pub use memory::{
    AttentionController, ConsolidationGateway, DecayEngine, EvictionOutcome, FocusOutcome,
    GraphEdge, GraphNode, GraphView, ItemSpec, MemoryResult, NotFoundKind, SweepReport,
    ValidationError, WorkingMemoryError,
};
pub use orchestration::{SessionSweepReport, StateView, WorkingMemoryService};

pub use workset_state::{
    Item, ItemCategory, ItemId, OwnerId, Provenance, StoreId, SurrealHandle, WorkingStore,
};

pub use metrics::METRICS;
pub use obs::StoreSpan;
pub use telemetry::init_tracing;

/// Workset version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
