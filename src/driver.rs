//! Scenario driver
//!
//! Walks the scenario matrices in order, feeding every averaged row to a
//! [`ReportSink`]. Failures below the driver turn into failed rows or
//! section notes; only a broken output stream stops a run.

use clap::ValueEnum;

use crate::cache::CacheControl;
use crate::config::{BenchConfig, MIB};
use crate::error::Result;
use crate::fixture::FixtureFile;
use crate::report::{format_bytes, ReportSink, RunInfo};
use crate::runner::{FileFixture, Fixture, MemoryFixture, Runner};
use crate::scenario::ScenarioMatrix;
use crate::timer::Stopwatch;

/// Banner printed once every selected suite has run
pub const COMPLETION_BANNER: &str = "Benchmark Complete";

/// Which suites a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SuiteSelection {
    /// Memory faults, then file readahead
    #[default]
    All,
    /// Anonymous-memory page faults only
    Memory,
    /// File readahead only
    File,
}

impl SuiteSelection {
    fn memory(self) -> bool {
        matches!(self, SuiteSelection::All | SuiteSelection::Memory)
    }

    fn file(self) -> bool {
        matches!(self, SuiteSelection::All | SuiteSelection::File)
    }
}

/// Counts for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub failed: usize,
    /// Sections (or whole suites) that were skipped with a note
    pub skipped: usize,
}

pub struct Driver<S: ReportSink> {
    config: BenchConfig,
    sink: S,
    runner: Runner,
    reuse_fixture: bool,
    keep_fixture: bool,
    cache: Option<CacheControl>,
}

impl<S: ReportSink> Driver<S> {
    pub fn new(config: BenchConfig, sink: S) -> Self {
        let runner = Runner::new(config.iterations);
        Self {
            config,
            sink,
            runner,
            reuse_fixture: false,
            keep_fixture: false,
            cache: None,
        }
    }

    /// Adopt the file at the configured path instead of creating one
    pub fn reuse_fixture(mut self, reuse: bool) -> Self {
        self.reuse_fixture = reuse;
        self
    }

    /// Leave a created fixture on disk after the run
    pub fn keep_fixture(mut self, keep: bool) -> Self {
        self.keep_fixture = keep;
        self
    }

    /// Override the probed cache control
    pub fn cache_control(mut self, cache: CacheControl) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn run(&mut self, selection: SuiteSelection) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let stopwatch = Stopwatch::start();
        tracing::info!(?selection, iterations = self.runner.iterations(), "starting run");

        if selection.memory() {
            self.run_memory(&mut summary)?;
        }
        if selection.file() {
            self.run_file(&mut summary)?;
        }

        self.sink.finish(COMPLETION_BANNER)?;
        tracing::info!(
            rows = summary.rows,
            failed = summary.failed,
            skipped = summary.skipped,
            elapsed_ms = stopwatch.stop().duration.as_millis() as u64,
            "run complete"
        );
        Ok(summary)
    }

    fn run_memory(&mut self, summary: &mut RunSummary) -> Result<()> {
        let memory = &self.config.memory;
        self.sink.begin(&RunInfo {
            title: "Memory Prefetch Benchmark".to_string(),
            lines: vec![format!(
                "Page Size: {} bytes | Iterations: {}",
                memory.page_size,
                self.runner.iterations()
            )],
        })?;

        let matrix = ScenarioMatrix::memory(memory);
        self.run_matrix(&matrix, &MemoryFixture, summary)
    }

    fn run_file(&mut self, summary: &mut RunSummary) -> Result<()> {
        let file = &self.config.file;
        let cache = match &self.cache {
            Some(c) => c.clone(),
            None => CacheControl::probe(file.settle_delay()),
        };
        self.sink.begin(&RunInfo {
            title: "File Readahead Benchmark".to_string(),
            lines: vec![
                format!("Test file: {}", file.path.display()),
                if self.reuse_fixture {
                    "File size: existing".to_string()
                } else {
                    format!("File size: {}", format_bytes(file.file_size))
                },
                format!(
                    "Cache drop: {}",
                    if cache.is_supported() { "global" } else { "fadvise" }
                ),
                format!("Iterations: {}", self.runner.iterations()),
            ],
        })?;

        let acquired = if self.reuse_fixture {
            FixtureFile::existing(&file.path)
        } else {
            FixtureFile::create(&file.path, file.file_size, file.fill, self.config.random_seed)
                .map(|f| if self.keep_fixture { f.keep() } else { f })
        };
        let fixture = match acquired {
            Ok(f) => f,
            Err(e) => {
                let message = format!("Failed to prepare test file: {}", e);
                tracing::error!("file suite skipped: {}", e);
                eprintln!("Error: {}", message);
                self.sink.note(&message)?;
                summary.skipped += 1;
                return Ok(());
            }
        };
        if fixture.len() < MIB {
            tracing::warn!(
                len = fixture.len(),
                "fixture is smaller than 1MB; readahead may not engage"
            );
        }

        let matrix = ScenarioMatrix::file(file, fixture.len());
        let target = FileFixture::new(fixture.path(), cache);
        self.run_matrix(&matrix, &target, summary)
        // `fixture` drops here, removing the file unless kept or adopted
    }

    fn run_matrix<F: Fixture>(
        &mut self,
        matrix: &ScenarioMatrix,
        fixture: &F,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let seed = self.config.random_seed;
        for section in &matrix.sections {
            self.sink.section(&section.title, section.suite)?;
            let mut permutation = None;

            for scenario in &section.scenarios {
                let units = scenario.units();
                let pattern = match scenario.kind.materialize(units, seed, &mut permutation) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::error!(scenario = %scenario.name, "section aborted: {}", e);
                        eprintln!("Error: {}: {}", section.title, e);
                        self.sink.note(&e.to_string())?;
                        summary.skipped += 1;
                        break;
                    }
                };

                tracing::debug!(
                    scenario = %scenario.name,
                    size = scenario.size,
                    unit = scenario.unit,
                    "running"
                );
                let result = self.runner.run_scenario(fixture, scenario, &pattern);
                summary.rows += 1;
                if result.failed {
                    summary.failed += 1;
                }
                self.sink.row(&result)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, MemoryConfig, KIB};
    use crate::fixture::FillMode;
    use crate::json_output::{JsonOutput, JsonSink};
    use crate::table_output::TableOutput;
    use serial_test::serial;
    use std::path::Path;
    use tempfile::TempDir;

    fn small_config(dir: &Path) -> BenchConfig {
        BenchConfig {
            iterations: 2,
            random_seed: 7,
            memory: MemoryConfig {
                sizes: vec![64 * KIB, 256 * KIB],
                strides: vec![1, 4],
                pattern_size: 256 * KIB,
                page_size: 4096,
            },
            file: FileConfig {
                path: dir.join("fixture"),
                file_size: 64 * KIB,
                block_size: 4096,
                strides: vec![1, 2],
                block_sizes: vec![512, 4096],
                fill: FillMode::Pattern,
                settle_delay_ms: 0,
            },
        }
    }

    fn run(config: BenchConfig, selection: SuiteSelection) -> (RunSummary, String) {
        let mut driver = Driver::new(config, TableOutput::new(Vec::new()))
            .cache_control(CacheControl::disabled());
        let summary = driver.run(selection).unwrap();
        let out = String::from_utf8(driver.into_sink().into_inner()).unwrap();
        (summary, out)
    }

    #[test]
    #[serial]
    fn test_memory_suite_rows() {
        let dir = TempDir::new().unwrap();
        let (summary, out) = run(small_config(dir.path()), SuiteSelection::Memory);

        // 2 seq_write + 2 seq_read + 2 strides + reverse + random
        assert_eq!(summary.rows, 8);
        assert_eq!(summary.failed, 0);
        assert!(out.contains("Memory Prefetch Benchmark"));
        assert!(out.contains("Iterations: 2"));
        assert!(out.contains("stride_4_pg"));
        assert!(!out.contains("File Readahead Benchmark"));
        assert!(out.contains(COMPLETION_BANNER));
    }

    #[test]
    fn test_file_suite_removes_fixture() {
        let dir = TempDir::new().unwrap();
        let config = small_config(dir.path());
        let path = config.file.path.clone();
        let (summary, out) = run(config, SuiteSelection::File);

        // 2 cold/hot + 3 patterns + 2 strides + 2 block sizes
        assert_eq!(summary.rows, 9);
        assert_eq!(summary.failed, 0);
        assert!(out.contains("[Access Pattern Comparison] (4KB block)"));
        assert!(out.contains("sequential (block=512B)"));
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_fixture() {
        let dir = TempDir::new().unwrap();
        let config = small_config(dir.path());
        let path = config.file.path.clone();

        let mut driver = Driver::new(config, TableOutput::new(Vec::new()))
            .cache_control(CacheControl::disabled())
            .keep_fixture(true);
        driver.run(SuiteSelection::File).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 64 * KIB);
    }

    #[test]
    fn test_reused_fixture_sets_region_size() {
        let dir = TempDir::new().unwrap();
        let config = small_config(dir.path());
        std::fs::write(&config.file.path, vec![1u8; 32 * 1024]).unwrap();
        let path = config.file.path.clone();

        let mut driver = Driver::new(config, TableOutput::new(Vec::new()))
            .cache_control(CacheControl::disabled())
            .reuse_fixture(true);
        let summary = driver.run(SuiteSelection::File).unwrap();
        let out = String::from_utf8(driver.into_sink().into_inner()).unwrap();

        assert_eq!(summary.failed, 0);
        assert!(out.contains("File size: existing"));
        assert!(out.contains("32KB"));
        // Adopted files are never deleted
        assert!(path.exists());
    }

    #[test]
    #[serial]
    fn test_unwritable_fixture_skips_file_suite_only() {
        let dir = TempDir::new().unwrap();
        let mut config = small_config(dir.path());
        config.file.path = dir.path().join("missing").join("fixture");

        let (summary, out) = run(config, SuiteSelection::All);

        assert_eq!(summary.rows, 8);
        assert_eq!(summary.skipped, 1);
        assert!(out.contains("Error: Failed to prepare test file"));
        assert!(!out.contains("[Stride Access Tests]"));
        assert!(out.contains(COMPLETION_BANNER));
    }

    #[test]
    #[serial]
    fn test_fixture_failure_noted_under_file_run_in_json() {
        let dir = TempDir::new().unwrap();
        let mut config = small_config(dir.path());
        config.file.path = dir.path().join("missing").join("fixture");

        let mut driver = Driver::new(config, JsonSink::new(Vec::new(), 2))
            .cache_control(CacheControl::disabled());
        driver.run(SuiteSelection::All).unwrap();
        let out = driver.into_sink().into_inner();
        let doc: JsonOutput = serde_json::from_slice(&out).unwrap();

        assert_eq!(doc.runs.len(), 2);
        assert_eq!(doc.runs[1].title, "File Readahead Benchmark");
        assert!(doc.runs[1].notes[0].contains("create fixture"));
        assert!(doc.runs[0].notes.is_empty());
        assert!(doc.sections.iter().all(|s| s.notes.is_empty()));
    }

    #[test]
    #[serial]
    fn test_index_buffer_failure_skips_random_group() {
        let dir = TempDir::new().unwrap();
        let mut config = small_config(dir.path());
        config.memory.strides.clear();
        // Far beyond any address space: the mapping and the index buffer both fail
        config.memory.pattern_size = 1 << 62;

        let (summary, out) = run(config, SuiteSelection::Memory);

        // Sequential rows succeed, reverse fails to map, random never runs
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(out.contains("reverse_write"));
        assert!(!out.contains("random_write"));
        assert!(out.contains("Error: failed to allocate random index buffer"));
        assert!(out.contains(COMPLETION_BANNER));
    }

    #[test]
    fn test_suite_selection() {
        assert!(SuiteSelection::All.memory() && SuiteSelection::All.file());
        assert!(SuiteSelection::Memory.memory() && !SuiteSelection::Memory.file());
        assert!(!SuiteSelection::File.memory() && SuiteSelection::File.file());
    }
}
