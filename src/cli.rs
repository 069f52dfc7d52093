//! CLI argument parsing for readahead-bench

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::BenchConfig;
use crate::driver::SuiteSelection;

/// Output format for benchmark results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width tables (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "readahead-bench")]
#[command(version)]
#[command(
    about = "Measure how the kernel's readahead and fault-around react to access patterns",
    long_about = None
)]
pub struct Cli {
    /// Fixture file for the file suite (default: /tmp/readahead_test_file)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Suites to run
    #[arg(long = "suite", value_enum, default_value = "all")]
    pub suite: SuiteSelection,

    /// Output format (text, json or csv)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Trials averaged per row (overrides the config file)
    #[arg(short = 'n', long = "iterations", value_name = "N")]
    pub iterations: Option<usize>,

    /// Seed for random permutations, decimal or 0x-prefixed hex
    #[arg(long = "seed", value_name = "N", value_parser = parse_seed)]
    pub seed: Option<u64>,

    /// Use the file at PATH as-is; it is neither created nor deleted
    #[arg(long = "reuse-fixture")]
    pub reuse_fixture: bool,

    /// Do not delete the fixture after the run
    #[arg(long = "keep-fixture")]
    pub keep_fixture: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut BenchConfig) {
        if let Some(path) = &self.path {
            config.file.path = path.clone();
        }
        if let Some(n) = self.iterations {
            config.iterations = n;
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
    }
}

fn parse_seed(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid seed '{}': {}", s, e))
}
