//! Zipgate CLI — the main entry point.
//!
//! Commands:
//! - `init`    — Write a default config file
//! - `sweep`   — Reclaim stale sandboxes and lock markers
//! - `scan`    — Check a local file for secrets
//! - `write`   — Copy a local file into your sandbox
//! - `files`   — List your sandbox
//! - `rm`      — Remove a sandbox file
//! - `upload`  — Upload a sandbox file (or local bytes) to Zipline
//! - `list`    — List uploaded files
//! - `delete`  — Delete an uploaded file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::warn;
use zipgate_config::GateConfig;
use zipgate_core::{Error, Result};
use zipgate_remote::{FileGate, ListQuery, RemoteStore};
use zipgate_security::{MaskedMakeWriter, Masker};

mod commands;

#[derive(Parser)]
#[command(
    name = "zipgate",
    about = "Zipgate — secure staging gate for Zipline uploads",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.zipgate/config.toml
    Init,

    /// Remove stale sandboxes and lock markers now
    Sweep,

    /// Check a local file for secrets without uploading it
    Scan {
        /// File to scan
        file: PathBuf,
    },

    /// Copy a local file into your sandbox under a bare name
    Write {
        /// Name inside the sandbox
        name: String,
        /// Local file to copy
        src: PathBuf,
    },

    /// List the files in your sandbox
    Files,

    /// Remove a file from your sandbox
    Rm {
        /// Name inside the sandbox
        name: String,
    },

    /// Upload a file to Zipline
    Upload {
        /// Sandbox filename (or the remote name when --from is given)
        name: String,
        /// Upload this local file's bytes instead of a sandbox file
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// List uploaded files
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<u32>,
        /// Only favorites
        #[arg(long)]
        favorite: bool,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an uploaded file by id
    Delete {
        /// Remote file id
        id: String,
    },
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => GateConfig::default(),
        _ => GateConfig::load().map_err(|e| format!("Failed to load config: {e}"))?,
    };
    let masker = Masker::new(config.credential());

    // Initialize tracing; every event is masked before it reaches stderr.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(MaskedMakeWriter::new(masker.clone()))
        .init();

    if let Err(e) = run(cli.command, &config, &masker).await {
        eprintln!("❌ {}", masker.user_message(&e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, config: &GateConfig, masker: &Masker) -> Result<()> {
    match command {
        Commands::Init => commands::init::run().await,
        Commands::Sweep => commands::sweep::run(config, masker.clone()).await,
        Commands::Scan { file } => commands::scan::run(&file).await,
        command => {
            let gate = FileGate::connect(config)?;
            let report = gate.start().await;
            if report.timed_out {
                warn!("Startup sweep timed out, continuing");
            }
            interruptible(dispatch(command, &gate)).await
        }
    }
}

async fn dispatch<S: RemoteStore>(command: Commands, gate: &FileGate<S>) -> Result<()> {
    match command {
        Commands::Write { name, src } => commands::write::run(gate, &name, &src).await,
        Commands::Files => commands::sandbox::list(gate).await,
        Commands::Rm { name } => commands::sandbox::remove(gate, &name).await,
        Commands::Upload { name, from } => commands::upload::run(gate, &name, from.as_deref()).await,
        Commands::List {
            search,
            page,
            favorite,
            json,
        } => {
            let query = ListQuery {
                page,
                search,
                favorite: favorite.then_some(true),
                ..ListQuery::default()
            };
            commands::list::run(gate, &query, json).await
        }
        Commands::Delete { id } => commands::delete::run(gate, &id).await,
        Commands::Init | Commands::Sweep | Commands::Scan { .. } => Ok(()),
    }
}

/// Abandon `operation` on Ctrl-C. Dropping it releases whatever it staged.
async fn interruptible(operation: impl std::future::Future<Output = Result<()>>) -> Result<()> {
    tokio::select! {
        result = operation => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, staged content released");
            Err(Error::Internal("interrupted".into()))
        }
    }
}
