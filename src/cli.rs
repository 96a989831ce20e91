//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// synapse-density - dendritic E/I synapse densities per neuron
///
/// Extracts dendritic synapse densities (#synapses per unit length) for each
/// neuron of a circuit target in isolation, plus projection densities.
///
/// Examples:
///   synapse-density circuits/O1/circuit.json
///   synapse-density circuits/O1/circuit.json L5 8
///   synapse-density circuits/O1/circuit.json All 8 64 --format csv
///   synapse-density --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Circuit configuration (JSON circuit snapshot)
    #[arg(value_name = "CIRCUIT_CONFIG", required_unless_present = "init_config")]
    pub circuit_config: Option<PathBuf>,

    /// Circuit target to analyze in isolation [default: All]
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Number of parallel workers [default: 1]
    #[arg(value_name = "WORKERS")]
    pub workers: Option<usize>,

    /// Number of data chunks (must be >= WORKERS) [default: WORKERS]
    #[arg(value_name = "CHUNKS")]
    pub chunks: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .synapse-density.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the cell table is written to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format (json, csv)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable the progress bar and per-chunk progress lines
    #[arg(long)]
    pub no_progress: bool,

    /// Generate a default .synapse-density.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format of the cell table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON with columns, index and data (default)
    #[default]
    Json,
    /// Comma-separated values with a header row
    Csv,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err("Number of parallel workers must be at least 1".to_string());
            }
        }

        if let Some(chunks) = self.chunks {
            if chunks == 0 {
                return Err("Number of data chunks must be at least 1".to_string());
            }
            if let Some(workers) = self.workers {
                if chunks < workers {
                    return Err(format!(
                        "Number of data chunks ({}) too low for {} parallel workers",
                        chunks, workers
                    ));
                }
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.circuit_config {
            if !path.is_file() {
                return Err(format!("Circuit config not found: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            circuit_config: None,
            target: None,
            workers: None,
            chunks: None,
            config: None,
            output_dir: None,
            format: None,
            verbose: false,
            quiet: false,
            no_progress: false,
            init_config: false,
        }
    }

    #[test]
    fn test_positional_arguments() {
        let args = Args::try_parse_from(["synapse-density", "circuit.json", "L5", "4", "16"]).unwrap();
        assert_eq!(args.circuit_config, Some(PathBuf::from("circuit.json")));
        assert_eq!(args.target.as_deref(), Some("L5"));
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.chunks, Some(16));
    }

    #[test]
    fn test_circuit_config_required() {
        assert!(Args::try_parse_from(["synapse-density"]).is_err());
        assert!(Args::try_parse_from(["synapse-density", "--init-config"]).is_ok());
    }

    #[test]
    fn test_validation_chunks_below_workers() {
        let mut args = make_args();
        args.workers = Some(4);
        args.chunks = Some(2);
        assert!(args.validate().is_err());

        args.chunks = Some(4);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_workers() {
        let mut args = make_args();
        args.workers = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_circuit() {
        let mut args = make_args();
        args.circuit_config = Some(PathBuf::from("/nonexistent/circuit.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(OutputFormat::Json.extension(), "json");
        assert_eq!(OutputFormat::Csv.extension(), "csv");
    }
}
