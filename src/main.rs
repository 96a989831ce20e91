//! synapse-density - dendritic synapse densities of a circuit target
//!
//! Extracts, for every neuron of a circuit target analyzed in isolation, the
//! dendritic excitatory/inhibitory synapse densities (#synapses per unit
//! dendrite length) and the densities of synapses from external projections.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (invalid arguments, configuration, circuit query failure, I/O)

mod circuit;
mod cli;
mod config;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use chrono::Local;
use circuit::{CircuitLoader, SnapshotLoader};
use cli::Args;
use config::{Config, CONFIG_FILE};
use models::TableSummary;
use pipeline::RunOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can enable verbose output
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("synapse-density v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_source {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    if let Err(e) = run_extraction(&args, &config).await {
        error!("Extraction failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .synapse-density.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.logging.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the extraction and write the cell table.
async fn run_extraction(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    let circuit_config = args
        .circuit_config
        .clone()
        .context("Missing circuit config")?;

    let options = RunOptions {
        target: config.run.target.clone(),
        workers: config.run.workers,
        chunks: config.run.effective_chunks(),
        show_progress: config.logging.progress,
        chunk_progress: config.logging.progress,
    };
    options.validate()?;

    let loader = Arc::new(SnapshotLoader::new(&circuit_config));
    info!(
        "Extracting synapse densities for target \"{}\" of {} ({} workers, {} chunks)",
        options.target,
        loader.locator(),
        options.workers,
        options.chunks
    );

    let table = pipeline::run(loader, &options)
        .await
        .context("Failed to build cell table")?;

    if table.is_empty() {
        warn!("Target \"{}\" contains no cells", options.target);
    }

    info!(
        "Total time elapsed ({} cells): {:.0}s",
        table.len(),
        start_time.elapsed().as_secs_f64()
    );

    let summary = TableSummary::from_table(&table);
    debug!("Projections: {:?}", table.projections);

    let save_path = report::output_path(
        &config.run.output_dir,
        &circuit_config,
        &options.target,
        &Local::now(),
        config.run.format,
    );
    report::write_table(&table, &save_path, config.run.format)?;

    if !args.quiet {
        println!("\n{}", report::generate_summary_text(&summary));
    }
    info!("Cell table saved to \"{}\"", save_path.display());

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Returns the path the configuration was read from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(CONFIG_FILE)))),
        None => Ok((Config::default(), None)),
    }
}
