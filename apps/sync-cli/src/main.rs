//! # VetSync CLI
//!
//! Runs one sync of the clinic API into the local store.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tracing-subscriber (RUST_LOG, default "info")                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncConfig::load(--config)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncOrchestrator::run() ◄── watch channel ◄── Ctrl-C / SIGTERM         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RunReport → stdout (table or --json)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An interrupted run still prints its partial report and exits with 0.
//! Only a store that cannot be opened is an error exit.

mod cli;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use vetsync_db::migrations::migration_status;
use vetsync_db::{Database, DbConfig, TableCounts};
use vetsync_sync::{HttpSourceClient, SyncConfig, SyncOrchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { json: false }) {
        Commands::Run { json } => run(cli.config, json).await,
        Commands::InitConfig { force } => init_config(cli.config, force),
        Commands::Status => status(cli.config).await,
    }
}

async fn run(config_path: Option<std::path::PathBuf>, json: bool) -> anyhow::Result<()> {
    let config = SyncConfig::load(config_path).context("loading configuration")?;
    info!(
        database = %config.database.path.display(),
        source = %config.source.base_url,
        "Starting sync"
    );

    let source = HttpSourceClient::new(&config.source).context("building source client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_tx.send_replace(true);
    });

    let mut orchestrator = SyncOrchestrator::new(config, source).with_shutdown(shutdown_rx);
    let report = orchestrator.run().await.context("sync run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    if report.interrupted {
        warn!("Run interrupted, partial results were committed");
    }

    Ok(())
}

fn init_config(config_path: Option<std::path::PathBuf>, force: bool) -> anyhow::Result<()> {
    let target = config_path
        .clone()
        .or_else(SyncConfig::default_config_path)
        .context("no config path available on this platform")?;

    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }

    let path = SyncConfig::new().save(Some(target))?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn status(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let config = SyncConfig::load(config_path).context("loading configuration")?;

    let db = Database::new(DbConfig::new(config.database.path.clone()))
        .await
        .with_context(|| format!("opening {}", config.database.path.display()))?;
    let mut conn = db.pool().acquire().await?;
    let counts = TableCounts::load(&mut conn).await?;
    drop(conn);
    let (total, applied) = migration_status(db.pool()).await?;
    db.close().await;

    println!("{}", config.database.path.display());
    println!("  schema migrations  {:>8}", format!("{}/{}", applied, total));
    println!("  customers          {:>8}", counts.customers);
    println!("  pets               {:>8}", counts.pets);
    println!("  vaccines           {:>8}", counts.vaccines);
    println!("  grooming services  {:>8}", counts.grooming_services);
    println!("  appointments       {:>8}", counts.appointments);
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing current record");
}
