//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.synapse-density.toml` files.

use crate::circuit::ALL_TARGET;
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".synapse-density.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Run settings.
    #[serde(default)]
    pub run: RunConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Extraction run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Circuit target analyzed in isolation.
    #[serde(default = "default_target")]
    pub target: String,

    /// Number of parallel workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of data chunks. Defaults to the worker count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,

    /// Directory the cell table is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Output table format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            workers: default_workers(),
            chunks: None,
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
        }
    }
}

impl RunConfig {
    /// Effective number of data chunks.
    pub fn effective_chunks(&self) -> usize {
        self.chunks.unwrap_or(self.workers)
    }
}

fn default_target() -> String {
    ALL_TARGET.to_string()
}

fn default_workers() -> usize {
    1 // No parallelization
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Logging and progress settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Show progress bar and per-chunk progress lines.
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Chunks fall back to the worker count when neither source sets them.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref target) = args.target {
            self.run.target = target.clone();
        }

        // Workers given on the command line reset a file-level chunk count.
        if let Some(workers) = args.workers {
            self.run.workers = workers;
            self.run.chunks = None;
        }
        if let Some(chunks) = args.chunks {
            self.run.chunks = Some(chunks);
        }

        if let Some(ref dir) = args.output_dir {
            self.run.output_dir = dir.clone();
        }
        if let Some(format) = args.format {
            self.run.format = format;
        }

        // Flags always override
        if args.verbose {
            self.logging.verbose = true;
        }
        if args.no_progress || args.quiet {
            self.logging.progress = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.run.target, "All");
        assert_eq!(config.run.workers, 1);
        assert_eq!(config.run.effective_chunks(), 1);
        assert_eq!(config.run.format, OutputFormat::Json);
        assert!(config.logging.progress);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[run]
target = "Mosaic"
workers = 8
chunks = 32
output_dir = "tables"
format = "csv"

[logging]
verbose = true
progress = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.run.target, "Mosaic");
        assert_eq!(config.run.workers, 8);
        assert_eq!(config.run.effective_chunks(), 32);
        assert_eq!(config.run.output_dir, PathBuf::from("tables"));
        assert_eq!(config.run.format, OutputFormat::Csv);
        assert!(config.logging.verbose);
        assert!(!config.logging.progress);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.run.workers = 8;
        config.run.chunks = Some(32);

        let args = Args::try_parse_from(["synapse-density", "c.json", "L5", "4"]).unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.run.target, "L5");
        assert_eq!(config.run.workers, 4);
        assert_eq!(config.run.effective_chunks(), 4);
    }

    #[test]
    fn test_merge_keeps_file_values() {
        let mut config = Config::default();
        config.run.workers = 8;
        config.run.chunks = Some(32);

        let args = Args::try_parse_from(["synapse-density", "c.json", "--no-progress"]).unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.run.target, "All");
        assert_eq!(config.run.workers, 8);
        assert_eq!(config.run.effective_chunks(), 32);
        assert!(!config.logging.progress);
    }

    #[test]
    fn test_chunks_key() {
        let config: Config = toml::from_str("[run]\nworkers = 2\nchunks = 8\n").unwrap();
        assert_eq!(config.run.workers, 2);
        assert_eq!(config.run.effective_chunks(), 8);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Config>("[run]\nworkers = 2\nsplits = 8\n").is_err());
        assert!(toml::from_str::<Config>("[logging]\nverbos = true\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[run]\nworkers = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.run.workers, 3);
        assert_eq!(config.run.target, "All");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[run]"));
        assert!(toml_str.contains("[logging]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.run.workers, 1);
    }
}
