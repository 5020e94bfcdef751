//! Workset CLI
//!
//! The `workset` command drives a per-session working memory stored in
//! SurrealDB. Every command prints its result as JSON on stdout; logs go to
//! stderr.
//!
//! ## Commands
//!
//! - `init`: Create the store for a session
//! - `add`: Add an item, evicting and consolidating as needed
//! - `state`: Show the decayed store contents
//! - `focus`: Rehearse an item and its associates
//! - `consolidate`: Promote important items to long-term memory and prune
//! - `graph`: Show the association graph

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{debug, Level};

use workset_core::{
    Caller, EngineConfig, ItemId, ItemSpec, TrustedIdentityResolver, WorkingMemoryService,
};
use workset_state::SurrealHandle;

#[derive(Parser)]
#[command(name = "workset")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bounded, decaying working memory for agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Engine tuning file (TOML); WORKSET_* variables still override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Owner the stores are filed under (default: $USER)
    #[arg(long, global = true, env = "WORKSET_OWNER")]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the working store for a session (no-op if it exists)
    Init {
        #[arg(short, long)]
        session: String,

        /// Maximum number of items (default from config)
        #[arg(short, long)]
        capacity: Option<usize>,
    },

    /// Add an item to a session's working memory
    Add {
        #[arg(short, long)]
        session: String,

        /// concept | entity | task | preference | context
        #[arg(short = 'k', long)]
        category: String,

        /// chat | memory | inference
        #[arg(short, long)]
        provenance: Option<String>,

        /// Extra metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,

        /// Item content
        content: String,
    },

    /// Show the current (decayed) state of a session
    State {
        #[arg(short, long)]
        session: String,

        /// Include the association graph
        #[arg(short, long)]
        associations: bool,
    },

    /// Focus an item, boosting it and its associates
    Focus {
        #[arg(short, long)]
        session: String,

        /// Item ID to focus
        item: String,
    },

    /// Consolidate important items to long-term memory and prune the rest
    Consolidate {
        #[arg(short, long)]
        session: String,
    },

    /// Show the association graph of a session
    Graph {
        #[arg(short, long)]
        session: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    workset_core::init_tracing(cli.json, level);

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load engine config")?;
    debug!(?config, "engine config loaded");

    let handle = SurrealHandle::setup_from_env()
        .await
        .context("Failed to connect to Workset database")?;
    let svc = build_service(&handle, config);
    let caller = resolve_caller(cli.owner);

    let output = match cli.command {
        Commands::Init { session, capacity } => cmd_init(&svc, &caller, &session, capacity).await?,
        Commands::Add {
            session,
            category,
            provenance,
            metadata,
            content,
        } => {
            cmd_add(
                &svc,
                &caller,
                &session,
                &content,
                &category,
                provenance.as_deref(),
                metadata.as_deref(),
            )
            .await?
        }
        Commands::State {
            session,
            associations,
        } => cmd_state(&svc, &caller, &session, associations).await?,
        Commands::Focus { session, item } => cmd_focus(&svc, &caller, &session, &item).await?,
        Commands::Consolidate { session } => cmd_consolidate(&svc, &caller, &session).await?,
        Commands::Graph { session } => cmd_graph(&svc, &caller, &session).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_service(handle: &SurrealHandle, config: EngineConfig) -> WorkingMemoryService {
    WorkingMemoryService::new(
        Arc::new(handle.session_repository()),
        Arc::new(handle.long_term_store()),
        Arc::new(TrustedIdentityResolver),
        config,
    )
}

fn resolve_caller(owner: Option<String>) -> Caller {
    owner
        .or_else(|| std::env::var("USER").ok())
        .map(Caller::new)
        .unwrap_or_else(Caller::anonymous)
}

async fn cmd_init(
    svc: &WorkingMemoryService,
    caller: &Caller,
    session: &str,
    capacity: Option<usize>,
) -> Result<Value> {
    let store_id = svc
        .initialize(caller, session, capacity)
        .await
        .with_context(|| format!("Failed to initialize session {session}"))?;
    Ok(json!({ "session": session, "store_id": store_id }))
}

async fn cmd_add(
    svc: &WorkingMemoryService,
    caller: &Caller,
    session: &str,
    content: &str,
    category: &str,
    provenance: Option<&str>,
    metadata: Option<&str>,
) -> Result<Value> {
    let mut spec = ItemSpec::new(content, category);
    if let Some(p) = provenance {
        spec = spec.with_provenance(p);
    }
    if let Some(raw) = metadata {
        let value: Value = serde_json::from_str(raw).context("Failed to parse --metadata as JSON")?;
        spec = spec.with_metadata(value);
    }

    let item_id = svc
        .add_item(caller, session, spec)
        .await
        .with_context(|| format!("Failed to add item to session {session}"))?;
    Ok(json!({ "session": session, "item_id": item_id }))
}

async fn cmd_state(
    svc: &WorkingMemoryService,
    caller: &Caller,
    session: &str,
    associations: bool,
) -> Result<Value> {
    let view = svc
        .get_state(caller, session, associations)
        .await
        .with_context(|| format!("Failed to read session {session}"))?;
    match view {
        Some(view) => Ok(serde_json::to_value(view)?),
        None => Ok(json!({ "session": session, "state": null })),
    }
}

async fn cmd_focus(
    svc: &WorkingMemoryService,
    caller: &Caller,
    session: &str,
    item: &str,
) -> Result<Value> {
    let outcome = svc
        .focus_item(caller, session, &ItemId::from(item))
        .await
        .with_context(|| format!("Failed to focus {item} in session {session}"))?;
    Ok(json!({
        "session": session,
        "item_id": item,
        "found": outcome.found,
        "boosted": outcome.boosted,
    }))
}

async fn cmd_consolidate(svc: &WorkingMemoryService, caller: &Caller, session: &str) -> Result<Value> {
    let report = svc.consolidate_session(caller, session).await;
    Ok(serde_json::to_value(report)?)
}

async fn cmd_graph(svc: &WorkingMemoryService, caller: &Caller, session: &str) -> Result<Value> {
    let graph = svc
        .graph_view(caller, session)
        .await
        .with_context(|| format!("Failed to build graph for session {session}"))?;
    match graph {
        Some(graph) => Ok(serde_json::to_value(graph)?),
        None => Ok(json!({ "session": session, "graph": null })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn in_memory() -> WorkingMemoryService {
        let handle = SurrealHandle::setup_db().await.unwrap();
        build_service(&handle, EngineConfig::default())
    }

    #[test]
    fn cli_parses_add_with_flags() {
        let cli = Cli::try_parse_from([
            "workset",
            "--owner",
            "alice",
            "add",
            "-s",
            "s1",
            "-k",
            "task",
            "--metadata",
            r#"{"turn":1}"#,
            "write the report",
        ])
        .unwrap();
        assert_eq!(cli.owner.as_deref(), Some("alice"));
        match cli.command {
            Commands::Add {
                session,
                category,
                content,
                metadata,
                ..
            } => {
                assert_eq!(session, "s1");
                assert_eq!(category, "task");
                assert_eq!(content, "write the report");
                assert!(metadata.is_some());
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn explicit_owner_wins() {
        assert_eq!(
            resolve_caller(Some("bob".into())).subject(),
            Some("bob")
        );
    }

    #[tokio::test]
    async fn test_session_lifecycle_through_commands() {
        let svc = in_memory().await;
        let alice = Caller::new("alice");

        let init = cmd_init(&svc, &alice, "s1", Some(3)).await.unwrap();
        assert!(init["store_id"].is_string());

        let added = cmd_add(&svc, &alice, "s1", "write the report", "task", None, Some(r#"{"turn":1}"#))
            .await
            .unwrap();
        let item_id = added["item_id"].as_str().unwrap().to_string();
        cmd_add(&svc, &alice, "s1", "review the report", "task", Some("inference"), None)
            .await
            .unwrap();

        let state = cmd_state(&svc, &alice, "s1", true).await.unwrap();
        assert_eq!(state["items"].as_array().unwrap().len(), 2);
        assert_eq!(state["graph"]["edges"].as_array().unwrap().len(), 1);

        let focused = cmd_focus(&svc, &alice, "s1", &item_id).await.unwrap();
        assert_eq!(focused["found"], true);

        let graph = cmd_graph(&svc, &alice, "s1").await.unwrap();
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 2);

        let report = cmd_consolidate(&svc, &alice, "s1").await.unwrap();
        assert_eq!(report["stores_swept"], 1);
        assert_eq!(report["consolidated"], 2);
    }

    #[tokio::test]
    async fn test_bad_metadata_is_rejected() {
        let svc = in_memory().await;
        let alice = Caller::new("alice");
        cmd_init(&svc, &alice, "s1", None).await.unwrap();

        assert!(cmd_add(&svc, &alice, "s1", "x", "task", None, Some("not json"))
            .await
            .is_err());
        assert!(cmd_add(&svc, &alice, "s1", "x", "task", None, Some("[1, 2]"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_missing_session_reads_as_null() {
        let svc = in_memory().await;
        let alice = Caller::new("alice");
        let state = cmd_state(&svc, &alice, "nope", false).await.unwrap();
        assert!(state["state"].is_null());
        assert!(cmd_focus(&svc, &alice, "nope", "x").await.is_err());
    }
}
