//! Error taxonomy for the benchmark harness
//!
//! Every variant names the operation that failed so the driver can print a
//! useful diagnostic before skipping the affected scenario.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing or measuring a scenario
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("create fixture {path}: {source}")]
    FixtureCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("open fixture {path}: {source}")]
    FixtureOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fixture {path} is {len} bytes, scenario needs {needed}")]
    FixtureTooSmall {
        path: PathBuf,
        len: u64,
        needed: u64,
    },

    #[error("mmap of {size} bytes failed: {source}")]
    Map {
        size: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} at offset {offset} failed: {source}")]
    Io {
        op: &'static str,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("getrusage failed: {0}")]
    Counter(#[from] nix::Error),

    #[error("failed to allocate random index buffer for {units} units")]
    IndexBuffer { units: usize },

    #[error("permutation covers {actual} units but region has {expected}")]
    PatternMismatch { expected: usize, actual: usize },

    #[error("write report: {0}")]
    Output(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_error_names_path() {
        let err = BenchError::FixtureOpen {
            path: PathBuf::from("/tmp/missing"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("open fixture /tmp/missing"));
    }

    #[test]
    fn test_io_error_names_operation() {
        let err = BenchError::Io {
            op: "pread",
            offset: 8192,
            source: std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
        };
        assert!(err.to_string().contains("pread at offset 8192"));
    }

    #[test]
    fn test_mismatch_message() {
        let err = BenchError::PatternMismatch {
            expected: 16,
            actual: 8,
        };
        assert_eq!(
            err.to_string(),
            "permutation covers 8 units but region has 16"
        );
    }
}
