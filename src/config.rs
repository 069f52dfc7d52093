//! Benchmark configuration
//!
//! Sizes, strides, iteration count and seed live in one explicit object
//! passed to the driver. Every field has a default, so a TOML file only
//! needs to name what it changes.
//!
//! # Example
//! ```
//! use readahead_bench::config::BenchConfig;
//!
//! let config = BenchConfig::from_toml_str("iterations = 5\n[file]\nblock_size = 8192\n").unwrap();
//! assert_eq!(config.iterations, 5);
//! assert_eq!(config.file.block_size, 8192);
//! assert_eq!(config.memory.page_size, 4096); // default kept
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::fixture::FillMode;
use crate::pattern::DEFAULT_SEED;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Fixture path used when none is given on the command line
pub const DEFAULT_FIXTURE_PATH: &str = "/tmp/readahead_test_file";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Trials averaged into every reported row
    pub iterations: usize,
    /// Seed for random permutations and random fixture content
    pub random_seed: u64,
    pub memory: MemoryConfig,
    pub file: FileConfig,
}

/// Anonymous-memory fault scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Region sizes for the sequential sections (bytes)
    pub sizes: Vec<u64>,
    /// Stride lengths in pages
    pub strides: Vec<usize>,
    /// Region size for the stride, reverse and random sections (bytes)
    pub pattern_size: u64,
    pub page_size: usize,
}

/// File readahead scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub path: PathBuf,
    /// Size of a freshly created fixture (bytes)
    pub file_size: u64,
    /// Block size for the pattern and stride sections (bytes)
    pub block_size: usize,
    /// Stride lengths in blocks
    pub strides: Vec<usize>,
    /// Block sizes for the block-size section (bytes)
    pub block_sizes: Vec<usize>,
    pub fill: FillMode,
    /// Pause after every cache drop
    pub settle_delay_ms: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            random_seed: DEFAULT_SEED,
            memory: MemoryConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            sizes: vec![4 * MIB, 64 * MIB, 256 * MIB, GIB],
            strides: vec![1, 2, 4, 8, 16, 32],
            pattern_size: 256 * MIB,
            page_size: 4096,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            file_size: 16 * MIB,
            block_size: 4096,
            // 4K, 8K, 16K, 64K and 256K at the default block size
            strides: vec![1, 2, 4, 16, 64],
            block_sizes: vec![512, 1024, 4096, 16 * 1024, 64 * 1024, 256 * 1024],
            fill: FillMode::Pattern,
            settle_delay_ms: 100,
        }
    }
}

impl FileConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl BenchConfig {
    /// Parse a TOML document; missing fields keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Reject values that would make a measurement meaningless
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(BenchError::Config("iterations must be >= 1".to_string()));
        }

        let page = self.memory.page_size;
        if page == 0 || !page.is_power_of_two() {
            return Err(BenchError::Config(format!(
                "page_size must be a power of two, got {}",
                page
            )));
        }
        if let Some(bad) = self.memory.strides.iter().find(|&&s| s == 0) {
            return Err(BenchError::Config(format!(
                "memory stride must be >= 1 page, got {}",
                bad
            )));
        }

        if self.file.block_size == 0 {
            return Err(BenchError::Config("block_size must be > 0".to_string()));
        }
        if self.file.block_sizes.contains(&0) {
            return Err(BenchError::Config(
                "block_sizes must all be > 0".to_string(),
            ));
        }
        if self.file.strides.contains(&0) {
            return Err(BenchError::Config(
                "file stride must be >= 1 block".to_string(),
            ));
        }

        Ok(())
    }
}
