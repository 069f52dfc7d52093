//! Fixture file for the file-access scenarios
//!
//! The harness creates its own fixture by default and removes it when done.
//! A file produced by external tooling can be adopted instead; adopted files
//! are never deleted.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

const CHUNK: usize = 4096;

/// Content written into a freshly created fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Byte `i` of every chunk is `i & 0xFF`
    #[default]
    Pattern,
    /// Seeded pseudo-random bytes
    Random,
}

#[derive(Debug)]
pub struct FixtureFile {
    path: PathBuf,
    len: u64,
    remove_on_drop: bool,
}

impl FixtureFile {
    /// Create (or truncate) `path` and fill it with `size` bytes
    pub fn create(path: &Path, size: u64, fill: FillMode, seed: u64) -> Result<Self> {
        let err = |source| BenchError::FixtureCreate {
            path: path.to_path_buf(),
            source,
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(err)?;

        // Remove a half-written file if filling fails
        let fixture = Self {
            path: path.to_path_buf(),
            len: size,
            remove_on_drop: true,
        };
        fill_file(&mut file, size, fill, seed).map_err(err)?;
        file.sync_all().map_err(err)?;

        tracing::info!(path = %path.display(), size, ?fill, "created fixture");
        Ok(fixture)
    }

    /// Adopt an existing file without taking ownership of its lifetime
    pub fn existing(path: &Path) -> Result<Self> {
        let len = std::fs::metadata(path)
            .map_err(|source| BenchError::FixtureOpen {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            len,
            remove_on_drop: false,
        })
    }

    /// Leave the file in place when this handle is dropped
    pub fn keep(mut self) -> Self {
        self.remove_on_drop = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for FixtureFile {
    fn drop(&mut self) {
        if self.remove_on_drop {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("failed to remove fixture {}: {}", self.path.display(), e);
            }
        }
    }
}

fn fill_file(file: &mut File, size: u64, fill: FillMode, seed: u64) -> std::io::Result<()> {
    let mut buf = [0u8; CHUNK];
    let mut rng = StdRng::seed_from_u64(seed);
    if fill == FillMode::Pattern {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (i & 0xFF) as u8;
        }
    }

    let mut written = 0u64;
    while written < size {
        let n = (size - written).min(CHUNK as u64) as usize;
        if fill == FillMode::Random {
            rng.fill_bytes(&mut buf[..n]);
        }
        file.write_all(&buf[..n])?;
        written += n as u64;
    }
    Ok(())
}
