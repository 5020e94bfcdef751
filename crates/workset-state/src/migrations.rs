//! SurrealDB schema migrations and initialization
//!
//! Sets up the Workset tables with their uniqueness constraints and lookup
//! indexes. Every statement uses `IF NOT EXISTS`, so running it again on an
//! existing database is a no-op.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all Workset tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing Workset SurrealDB schema");

    init_working_stores_table(db).await?;
    init_long_term_memories_table(db).await?;

    info!("Workset schema initialization complete");
    Ok(())
}

/// Initialize `working_stores`
///
/// Schema:
/// ```text
/// TABLE working_stores {
///   store_id:     STRING (unique)
///   owner:        STRING
///   session:      STRING (indexed)
///   items:        ARRAY<OBJECT>  (rewritten wholesale)
///   capacity:     INT
///   focus:        STRING?
///   last_update:  DATETIME
///   version:      INT            (compare-and-swap stamp)
///   created_at:   DATETIME
/// }
/// ```
///
/// Constraints:
/// - `(owner, session)` is unique, so concurrent creators collapse to one row
/// - `version` only moves through `UPDATE ... WHERE version = $expected`
async fn init_working_stores_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing working_stores table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS working_stores SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_store_key ON TABLE working_stores COLUMNS owner, session UNIQUE;

        DEFINE INDEX IF NOT EXISTS idx_store_id ON TABLE working_stores COLUMNS store_id UNIQUE;

        -- Maintenance sweeps look stores up by session
        DEFINE INDEX IF NOT EXISTS idx_store_session ON TABLE working_stores COLUMNS session;
    "#;

    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(format!("working_stores: {e}")))?;
    info!("✓ working_stores table initialized");
    Ok(())
}

/// Initialize `long_term_memories`
///
/// Append-only sink for consolidated items. `record_id` is unique; the
/// `memory_type` and `source` indexes serve downstream recall.
async fn init_long_term_memories_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing long_term_memories table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS long_term_memories SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_ltm_record_id ON TABLE long_term_memories COLUMNS record_id UNIQUE;

        DEFINE INDEX IF NOT EXISTS idx_ltm_memory_type ON TABLE long_term_memories COLUMNS memory_type;

        DEFINE INDEX IF NOT EXISTS idx_ltm_source ON TABLE long_term_memories COLUMNS source;
    "#;

    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(format!("long_term_memories: {e}")))?;
    info!("✓ long_term_memories table initialized");
    Ok(())
}
