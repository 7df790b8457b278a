//! Plantar Sentinel - foot-pressure frame analysis service
//!
//! # Usage
//!
//! ```bash
//! # Run the HTTP service (default subcommand)
//! plantar-sentinel serve --addr 0.0.0.0:8080
//!
//! # Ingest a device export for one patient
//! plantar-sentinel ingest --patient p-001 --file frame_20240115120000.csv
//!
//! # Score frames without storing them
//! plantar-sentinel analyze --file export.csv
//!
//! # Validate a config file
//! plantar-sentinel check-config --config engine_config.toml
//! ```
//!
//! # Environment Variables
//!
//! - `PLANTAR_CONFIG`: Path to engine config TOML (default: ./engine_config.toml)
//! - `PLANTAR_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use plantar_sentinel::api::{create_app, ApiState};
use plantar_sentinel::config::validation::{validate_ranges, validate_unknown_keys};
use plantar_sentinel::ingestion::split_frames;
use plantar_sentinel::{EngineConfig, FrameIngestor, PatientId, SledFrameStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "plantar-sentinel")]
#[command(about = "Foot-pressure frame analysis and alert engine")]
#[command(version)]
struct CliArgs {
    /// Engine config file; overrides the PLANTAR_CONFIG / ./engine_config.toml search
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the HTTP service
    Serve {
        /// Override the server address (default: "0.0.0.0:8080")
        #[arg(short, long)]
        addr: Option<String>,
        /// Override the database path
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Ingest a multi-frame export for one patient and print the result as JSON
    Ingest {
        #[arg(long)]
        patient: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Analyse every frame in a file without storing anything
    Analyze {
        #[arg(long)]
        file: PathBuf,
    },

    /// Validate a config file and report warnings
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

// ============================================================================
// Subcommands
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Ok(EngineConfig::load()),
    }
}

fn open_ingestor(config: EngineConfig, db: Option<PathBuf>) -> Result<Arc<FrameIngestor>> {
    let db_path = db.unwrap_or_else(|| config.storage.path.clone());
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }

    let store = SledFrameStore::open(&db_path)
        .with_context(|| format!("Failed to open frame store at {}", db_path.display()))?;
    Ok(Arc::new(FrameIngestor::new(Arc::new(store), Arc::new(config))))
}

async fn run_serve(
    config: EngineConfig,
    addr: Option<String>,
    db: Option<PathBuf>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let server_addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let ingestor = open_ingestor(config, db)?;
    let app = create_app(ApiState::new(ingestor, cancel_token.clone()));

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_addr))?;
    info!(addr = %server_addr, "HTTP server listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await;

    match result {
        Ok(()) => {
            info!("[HttpServer] Graceful shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("[HttpServer] Server error: {}", e);
            Err(anyhow::anyhow!("HTTP server error: {}", e))
        }
    }
}

async fn run_ingest(
    config: EngineConfig,
    patient: String,
    file: PathBuf,
    db: Option<PathBuf>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let ingestor = open_ingestor(config, db)?;
    let result = ingestor
        .process_batch(&PatientId::new(patient), &file_name, &content, &cancel_token)
        .await
        .with_context(|| format!("Upload of {} rejected", file.display()))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_analyze(config: EngineConfig, file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let payloads = split_frames(&content, config.grid.size);
    if payloads.is_empty() {
        anyhow::bail!(
            "Unable to detect any {0}x{0} frames in {1}",
            config.grid.size,
            file.display()
        );
    }

    for (index, raw) in payloads.iter().enumerate() {
        let line = match plantar_sentinel::analyze_frame(raw, &config.grid, &config.thresholds) {
            Ok(analysis) => serde_json::json!({ "frame": index + 1, "analysis": analysis }),
            Err(e) => serde_json::json!({ "frame": index + 1, "error": e.to_string() }),
        };
        println!("{line}");
    }
    Ok(())
}

fn run_check_config(path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = EngineConfig::load_from_file(path)
        .with_context(|| format!("{} is invalid", path.display()))?;

    let warnings: Vec<_> = validate_unknown_keys(&raw)
        .into_iter()
        .chain(validate_ranges(&config))
        .collect();
    for w in &warnings {
        println!("warning: {w}");
    }
    println!(
        "{} is valid ({} warning{})",
        path.display(),
        warnings.len(),
        if warnings.len() == 1 { "" } else { "s" }
    );
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    if let Some(SubCommand::CheckConfig { config }) = &args.command {
        return run_check_config(config);
    }

    let config = load_config(args.config.as_deref())?;

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    match args.command {
        None => run_serve(config, None, None, cancel_token).await,
        Some(SubCommand::Serve { addr, db }) => run_serve(config, addr, db, cancel_token).await,
        Some(SubCommand::Ingest { patient, file, db }) => {
            run_ingest(config, patient, file, db, cancel_token).await
        }
        Some(SubCommand::Analyze { file }) => run_analyze(config, file),
        Some(SubCommand::CheckConfig { .. }) => Ok(()),
    }
}
