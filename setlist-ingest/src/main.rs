//! setlist-ingest - DJ-set tracklist extraction and reconciliation service
//!
//! Subcommands:
//! - `serve` (default): HTTP API
//! - `dedup [--dry-run]`: one Offline Deduplicator pass over the catalog
//! - `extract <file>`: print the candidates found in a text file as JSON

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use setlist_common::config::{load_toml_config, TomlConfig};
use setlist_common::db::init_database;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use setlist_ingest::config::MatchSettings;
use setlist_ingest::extraction::{CandidateAssembler, SourceBlob, SourceKind};
use setlist_ingest::services::{HttpOracle, IdentificationOracle};
use setlist_ingest::AppState;

/// Command-line arguments for setlist-ingest
#[derive(Parser, Debug)]
#[command(name = "setlist-ingest")]
#[command(about = "DJ-set tracklist extraction and reconciliation service")]
#[command(version)]
struct Args {
    /// Config file (overrides SETLIST_CONFIG and the per-user file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "SETLIST_DATABASE")]
    database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SETLIST_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Merge duplicate catalog artists and tracks
    Dedup {
        /// Report groups without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Extract track candidates from a text file
    Extract {
        file: PathBuf,
        /// Author of the text
        #[arg(long)]
        author: Option<String>,
        /// Endorsement count
        #[arg(long, default_value_t = 0)]
        weight: u32,
        /// Source kind (description, comment, tracklist, page_text)
        #[arg(long, default_value = "description")]
        kind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_toml_config(args.config.as_deref());
    if let Some(database) = &args.database {
        config.database_path = database.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Dedup { dry_run } => dedup(&config, dry_run).await,
        Command::Extract {
            file,
            author,
            weight,
            kind,
        } => extract(&file, author, weight, &kind),
    }
}

async fn open_state(config: &TomlConfig) -> Result<AppState> {
    let db_path = config.resolved_database_path();
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let settings = MatchSettings::load(&pool)
        .await
        .context("Failed to load matching settings")?;

    let oracle: Option<Arc<dyn IdentificationOracle>> = match config.oracle_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            info!("Identification oracle: {}", url);
            let oracle: Arc<dyn IdentificationOracle> =
                Arc::new(HttpOracle::new(url).context("Failed to build oracle client")?);
            Some(oracle)
        }
        _ => None,
    };

    Ok(AppState::with_oracle(pool, settings, oracle))
}

async fn serve(config: &TomlConfig) -> Result<()> {
    info!("Starting setlist-ingest {}", env!("CARGO_PKG_VERSION"));

    let state = open_state(config).await?;
    let app = setlist_ingest::build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn dedup(config: &TomlConfig, dry_run: bool) -> Result<()> {
    let state = open_state(config).await?;
    let report = state
        .deduplicator()
        .run(dry_run)
        .await
        .context("Deduplication failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn extract(file: &Path, author: Option<String>, weight: u32, kind: &str) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let kind: SourceKind = serde_json::from_value(serde_json::Value::String(kind.to_string()))
        .with_context(|| format!("Unknown source kind: {}", kind))?;

    let mut blob = SourceBlob::new(kind, text).with_weight(weight);
    if let Some(author) = author {
        blob = blob.with_author(author);
    }

    let candidates = CandidateAssembler::new().assemble(&blob);
    if candidates.is_empty() {
        warn!("No candidates found in {}", file.display());
    }
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
