//! spicebox command-line interface.
//!
//! Starts the tool server on stdin/stdout. Logs go to stderr so they never
//! interleave with protocol messages.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spicebox_engine::LinearEngine;
use spicebox_server::{ServerConfig, StdioServer, ToolDispatcher};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spicebox")]
#[command(about = "Circuit simulation sessions served as JSON-RPC tools over stdio", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE", env = "SPICEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Library file or directory to index at startup (repeatable)
    #[arg(
        short,
        long = "library",
        value_name = "PATH",
        env = "SPICEBOX_LIBRARY_PATH",
        value_delimiter = ','
    )]
    libraries: Vec<PathBuf>,

    /// Log filter, e.g. debug or spicebox_server=debug; overrides RUST_LOG
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log filter '{}'", level))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.library_paths.extend(cli.libraries.iter().cloned());

    let engine = Arc::new(LinearEngine::new());
    let libraries = config.library_paths.clone();
    let dispatcher = ToolDispatcher::new(engine, config);

    if !libraries.is_empty() {
        let report = dispatcher.index_libraries(&libraries, false);
        for error in &report.errors {
            warn!(%error, "library indexing error");
        }
        info!(
            files = report.files_scanned,
            models = report.models_found,
            subcircuits = report.subcircuits_found,
            "libraries indexed"
        );
    }

    let mut server = StdioServer::new(Arc::new(dispatcher));
    let stdin = io::stdin();
    let stdout = io::stdout();
    server
        .serve(stdin.lock(), stdout.lock())
        .context("stdio transport failed")?;
    Ok(())
}
