//! SurrealDB Handle - Connection management
//!
//! Opens the database, selects namespace/database, runs the schema
//! migrations and hands out the repository implementations that share the
//! connection.
//!
//! Supports in-memory, local on-disk (surrealkv), URL and cloud (WebSocket)
//! connections.

use std::path::Path;

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

use crate::error::StateError;
use crate::migrations;
use crate::surreal_repository::{SurrealLongTermStore, SurrealSessionRepository};
use crate::Result;

const DEFAULT_NAMESPACE: &str = "workset";
const DEFAULT_DATABASE: &str = "main";
const DEFAULT_LOCAL_PATH: &str = ".workset/db";

/// Configuration for SurrealDB Cloud connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "workset")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create a new cloud configuration for a database user
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT (required)
    /// - SURREALDB_USERNAME (required)
    /// - SURREALDB_PASSWORD (required)
    /// - SURREALDB_NAMESPACE (optional, default: "workset")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_ROOT (optional, default: "false")
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`CloudConfig::from_env`] with variables read through `lookup`
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |var: &'static str| lookup(var).ok_or_else(|| format!("{var} not set"));
        let mut config = Self::new(
            required("SURREALDB_ENDPOINT")?,
            required("SURREALDB_USERNAME")?,
            required("SURREALDB_PASSWORD")?,
        );
        if let Some(ns) = lookup("SURREALDB_NAMESPACE") {
            config = config.with_namespace(ns);
        }
        if let Some(db) = lookup("SURREALDB_DATABASE") {
            config = config.with_database(db);
        }
        let is_root = lookup("SURREALDB_ROOT")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(config.with_root(is_root))
    }
}

/// SurrealDB connection handle for Workset
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

impl SurrealHandle {
    /// Connect to SurrealDB in-memory and set up schema
    #[instrument(skip_all)]
    pub async fn setup_db() -> Result<Self> {
        info!("Connecting to SurrealDB (in-memory)");
        let handle = Self::connect_url("mem://", DEFAULT_NAMESPACE, DEFAULT_DATABASE).await?;
        info!("SurrealDB connected and schema initialized");
        Ok(handle)
    }

    /// Open (or create) an on-disk surrealkv database under `path`
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn setup_local(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                path.display(),
                e
            ))
        })?;
        let url = format!("surrealkv://{}", path.display());
        info!("Using local persistence: {}", url);
        Self::connect_url(&url, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
    }

    /// Connect to SurrealDB Cloud
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    pub async fn setup_cloud(config: CloudConfig) -> Result<Self> {
        info!("Connecting to SurrealDB Cloud (root={})", config.is_root);

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root authentication failed: {}", e)))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| {
                StateError::Connection(format!("Database authentication failed: {}", e))
            })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        migrations::init_schema(&db).await?;

        info!("SurrealDB Cloud connected and schema initialized");
        Ok(SurrealHandle { db })
    }

    /// Connect using environment variables
    ///
    /// If SURREALDB_ENDPOINT is set, connects to cloud.
    /// If SURREALDB_URL is set, connects to that URL.
    /// Otherwise opens local persistence at WORKSET_DB_PATH (default `.workset/db`).
    #[instrument(skip_all)]
    pub async fn setup_from_env() -> Result<Self> {
        if let Ok(config) = CloudConfig::from_env() {
            info!("Cloud config found, connecting to SurrealDB Cloud");
            return Self::setup_cloud(config).await;
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            info!("SURREALDB_URL found, connecting to {}", url);
            return Self::connect_url(&url, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await;
        }

        let path =
            std::env::var("WORKSET_DB_PATH").unwrap_or_else(|_| DEFAULT_LOCAL_PATH.to_string());
        Self::setup_local(Path::new(&path)).await
    }

    async fn connect_url(url: &str, namespace: &str, database: &str) -> Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        Ok(SurrealHandle { db })
    }

    /// Session repository sharing this connection
    pub fn session_repository(&self) -> SurrealSessionRepository {
        SurrealSessionRepository::new(self.db.clone())
    }

    /// Long-term store sharing this connection
    pub fn long_term_store(&self) -> SurrealLongTermStore {
        SurrealLongTermStore::new(self.db.clone())
    }
}
