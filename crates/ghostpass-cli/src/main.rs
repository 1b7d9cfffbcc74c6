//! Ghostpass CLI - manage credential fields in encrypted secret stores
//!
//! Every store is unlocked with its master password, read from
//! `GHOSTPASS_PASSWORD` when set and prompted for otherwise.

mod commands;

use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::{Command, Context};
use ghostpass_core::{FileBackend, SettingsManager, StoreManager};

/// Ghostpass - deniable credential storage
#[derive(Parser, Debug)]
#[command(name = "ghostpass")]
#[command(version)]
#[command(about = "Ghostpass - encrypted credential fields with deniable decoys")]
struct Args {
    /// Directory holding settings and stores
    #[arg(long, env = "GHOSTPASS_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Store to operate on (defaults to the configured default store)
    #[arg(short, long, global = true)]
    store: Option<String>,

    /// Master password for the store
    #[arg(long, env = "GHOSTPASS_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Filter directives: `RUST_LOG` as given, `-v` adds debug on top,
/// and warnings only when neither is set
fn log_directives(verbose: bool, rust_log: Option<String>) -> String {
    match (rust_log, verbose) {
        (Some(env), true) => format!("{},debug", env),
        (Some(env), false) => env,
        (None, true) => "debug".to_string(),
        (None, false) => "warn".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so command output stays clean on stdout
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_directives(args.verbose, rust_log)))
        .with_writer(std::io::stderr)
        .init();

    let backend = match args.data_dir {
        Some(dir) => FileBackend::with_dir(dir),
        None => FileBackend::new(),
    }
    .context("Failed to open the data directory")?;
    let settings = SettingsManager::new(backend.data_dir()).context("Failed to load settings")?;
    debug!("Stores live in {:?}", backend.stores_dir());

    let manager = StoreManager::new(Arc::new(backend));
    debug!("Using {}", manager.backend_name());

    let mut ctx = Context::new(manager, settings, args.store, args.password);
    let output = ctx.run(args.command).await?;

    if !output.is_empty() {
        println!("{}", output.as_str());
    }
    Ok(())
}
