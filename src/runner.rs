//! Trial runner and repetition controller
//!
//! A trial acquires a fresh region, samples the counter and clock, runs the
//! traversal, samples again and releases the region. Trials never share a
//! region; the only warm state a measurement sees is the explicit warming
//! pass of [`AccessPattern::HotCache`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{compiler_fence, Ordering};

use crate::cache::CacheControl;
use crate::counter::{self, Counter, Metric, PageFaultCounter, TransferCounter};
use crate::error::Result;
use crate::pattern::{Access, AccessPattern};
use crate::region::{FileRegion, MemoryRegion, Region};
use crate::report::{RepetitionResult, TrialResult};
use crate::scenario::Scenario;
use crate::timer::Timer;

/// Source of fresh regions plus the counter that measures them
pub trait Fixture {
    type Region: Region;
    type Counter: Counter;

    /// Acquire a region sized for `scenario`
    fn acquire(&self, scenario: &Scenario) -> Result<Self::Region>;

    /// Counter for one trial
    fn counter(&self) -> Self::Counter;

    fn metric(&self) -> Metric;

    /// Precondition hook run before the region is acquired
    fn prepare(&self, _scenario: &Scenario) {}
}

/// Anonymous memory measured by page faults
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryFixture;

impl Fixture for MemoryFixture {
    type Region = MemoryRegion;
    type Counter = PageFaultCounter;

    fn acquire(&self, scenario: &Scenario) -> Result<MemoryRegion> {
        MemoryRegion::map(scenario.size, scenario.unit)
    }

    fn counter(&self) -> PageFaultCounter {
        PageFaultCounter
    }

    fn metric(&self) -> Metric {
        Metric::PageFaults
    }
}

/// A file on disk measured by bytes transferred
#[derive(Debug, Clone)]
pub struct FileFixture {
    path: PathBuf,
    cache: CacheControl,
}

impl FileFixture {
    pub fn new(path: impl Into<PathBuf>, cache: CacheControl) -> Self {
        Self {
            path: path.into(),
            cache,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Fixture for FileFixture {
    type Region = FileRegion;
    type Counter = TransferCounter;

    fn acquire(&self, scenario: &Scenario) -> Result<FileRegion> {
        FileRegion::open(
            &self.path,
            scenario.size,
            scenario.unit,
            scenario.access == Access::Write,
        )
    }

    fn counter(&self) -> TransferCounter {
        TransferCounter::new()
    }

    fn metric(&self) -> Metric {
        Metric::BytesTransferred
    }

    fn prepare(&self, scenario: &Scenario) {
        if scenario.drop_cache {
            self.cache.drop_caches(Some(&self.path));
        }
    }
}

/// Visit every unit `pattern` selects, reporting bytes per call
#[inline]
fn traverse<R: Region>(
    region: &mut R,
    pattern: &AccessPattern,
    access: Access,
    mut on_call: impl FnMut(u64),
) -> Result<u64> {
    let mut visited = 0u64;
    for index in pattern.order(region.units()) {
        on_call(region.touch(index, access)?);
        visited += 1;
    }
    Ok(visited)
}

/// Runs scenarios a fixed number of times and averages them
#[derive(Debug, Clone, Copy)]
pub struct Runner {
    iterations: usize,
}

impl Runner {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// One hermetic measurement of `pattern` over a fresh region
    pub fn run_trial<F: Fixture>(
        &self,
        fixture: &F,
        scenario: &Scenario,
        pattern: &AccessPattern,
    ) -> Result<TrialResult> {
        fixture.prepare(scenario);
        let mut region = fixture.acquire(scenario)?;
        pattern.check(region.units())?;

        if pattern.needs_warmup() {
            traverse(&mut region, &AccessPattern::Sequential, scenario.access, |_| {})?;
            region.rewind()?;
        }

        let counter = fixture.counter();
        compiler_fence(Ordering::SeqCst);
        let c_start = counter.sample()?;
        let t_start = Timer::now();

        let visited = traverse(&mut region, pattern, scenario.access, |n| counter.record(n))?;

        let t_end = Timer::now();
        let c_end = counter.sample()?;
        compiler_fence(Ordering::SeqCst);
        drop(region);

        let elapsed = Timer::elapsed(t_start, t_end);
        let delta = counter::delta(c_start, c_end);
        tracing::trace!(
            scenario = %scenario.name,
            duration_us = elapsed.duration.as_micros() as u64,
            aux = delta.value,
            visited,
            "trial complete"
        );
        Ok(TrialResult {
            duration: elapsed.duration,
            aux_count: delta.value,
            visited,
            clamped: elapsed.clamped || delta.clamped,
        })
    }

    /// Average `iterations` trials. A failing trial turns the scenario
    /// into a zero-valued row instead of aborting the run.
    pub fn run_scenario<F: Fixture>(
        &self,
        fixture: &F,
        scenario: &Scenario,
        pattern: &AccessPattern,
    ) -> RepetitionResult {
        let mut trials = Vec::with_capacity(self.iterations);
        for i in 0..self.iterations {
            match self.run_trial(fixture, scenario, pattern) {
                Ok(trial) => trials.push(trial),
                Err(e) => {
                    tracing::error!(scenario = %scenario.name, trial = i, "trial failed: {}", e);
                    eprintln!("{}: {}", scenario.name, e);
                    return RepetitionResult::failed(scenario, fixture.metric());
                }
            }
        }
        RepetitionResult::from_trials(scenario, fixture.metric(), &trials)
    }
}
