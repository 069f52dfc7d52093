//! readahead-bench - access-pattern benchmarks for kernel readahead and prefetch
//!
//! The library runs a fixed matrix of workloads (sequential, stride, reverse,
//! random and hot-cache) over anonymous memory and over a fixture file, and
//! reports how page faults and transfer time scale with the pattern.
//!
//! ```no_run
//! use readahead_bench::config::BenchConfig;
//! use readahead_bench::driver::{Driver, SuiteSelection};
//! use readahead_bench::table_output::TableOutput;
//!
//! let mut driver = Driver::new(BenchConfig::default(), TableOutput::new(std::io::stdout()));
//! driver.run(SuiteSelection::Memory).unwrap();
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod counter;
pub mod csv_output;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod json_output;
pub mod pattern;
pub mod region;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod table_output;
pub mod timer;

pub use error::{BenchError, Result};
