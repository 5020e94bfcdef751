//! worksetd: periodic consolidation sweeps over every working store.
//!
//! Each tick lists all persisted `(owner, session)` stores and sweeps them:
//! decay, promote important items to long-term memory, prune faded ones.
//! A tick never fails; per-store problems are logged and skipped.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use workset_core::{
    EngineConfig, SessionSweepReport, TrustedIdentityResolver, WorkingMemoryService, METRICS,
};
use workset_state::SurrealHandle;

#[derive(Parser)]
#[command(name = "worksetd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Workset consolidation daemon", long_about = None)]
struct Args {
    /// Seconds between sweeps
    #[arg(long, default_value_t = 300)]
    interval_secs: u64,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Engine tuning file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    workset_core::init_tracing(args.json, level);

    let config = EngineConfig::load(args.config.as_deref()).context("Failed to load engine config")?;
    let handle = SurrealHandle::setup_from_env()
        .await
        .context("Failed to connect to Workset database")?;
    let svc = WorkingMemoryService::new(
        Arc::new(handle.session_repository()),
        Arc::new(handle.long_term_store()),
        Arc::new(TrustedIdentityResolver),
        config,
    );

    info!(interval_secs = args.interval_secs, once = args.once, "worksetd started");
    let interval = Duration::from_secs(args.interval_secs.max(1));
    let ticks = run(&svc, interval, args.once, shutdown_signal()).await;
    METRICS.flush();
    info!(ticks, "worksetd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Sweep every `interval` until `shutdown` resolves. Returns the number of ticks run.
async fn run<F>(svc: &WorkingMemoryService, interval: Duration, once: bool, shutdown: F) -> u64
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ticks = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let report = svc.sweep_all().await;
                ticks += 1;
                log_tick(ticks, &report);
                if once {
                    break;
                }
            }
        }
    }
    ticks
}

fn log_tick(tick: u64, report: &SessionSweepReport) {
    info!(
        tick,
        stores_swept = report.stores_swept,
        stores_skipped = report.stores_skipped,
        consolidated = report.consolidated,
        failed = report.failed,
        pruned = report.pruned,
        "sweep finished"
    );
}
