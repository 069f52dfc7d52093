//! The fixed, ordered matrix of scenarios
//!
//! Sections and scenarios are stored in insertion order, which is also the
//! report order. Random permutations are not built here: they are
//! materialized by the driver right before a section runs, so a failed
//! index allocation only loses that section.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::config::{FileConfig, MemoryConfig};
use crate::error::Result;
use crate::pattern::{try_permutation, Access, AccessPattern};
use crate::report::format_bytes;

/// Which harness a section belongs to; selects the table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Memory,
    File,
}

/// Pattern identity without its runtime data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Sequential,
    Stride(NonZeroUsize),
    Reverse,
    Random,
    HotCache,
}

impl PatternKind {
    /// Build the runnable pattern for a region of `units` units. `cache`
    /// holds the permutation shared by the random scenarios of a section.
    pub fn materialize(
        &self,
        units: usize,
        seed: u64,
        cache: &mut Option<Arc<[usize]>>,
    ) -> Result<AccessPattern> {
        Ok(match *self {
            PatternKind::Sequential => AccessPattern::Sequential,
            PatternKind::Stride(units) => AccessPattern::Stride { units },
            PatternKind::Reverse => AccessPattern::Reverse,
            PatternKind::HotCache => AccessPattern::HotCache,
            PatternKind::Random => {
                let permutation = match cache {
                    Some(p) if p.len() == units => Arc::clone(p),
                    _ => {
                        let p = try_permutation(units, seed)?;
                        *cache = Some(Arc::clone(&p));
                        p
                    }
                };
                AccessPattern::Random { permutation }
            }
        })
    }
}

/// One (workload, size, parameter) triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub kind: PatternKind,
    pub access: Access,
    /// Region size in bytes
    pub size: u64,
    /// Unit granularity in bytes
    pub unit: usize,
    /// Evict cached pages before every trial
    pub drop_cache: bool,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        kind: PatternKind,
        access: Access,
        size: u64,
        unit: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            access,
            size,
            unit,
            drop_cache: false,
        }
    }

    pub fn cold(mut self) -> Self {
        self.drop_cache = true;
        self
    }

    /// Units in the region, counting a trailing partial unit
    pub fn units(&self) -> usize {
        usize::try_from(self.size.div_ceil(self.unit as u64)).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub suite: Suite,
    pub scenarios: Vec<Scenario>,
}

impl Section {
    fn new(title: impl Into<String>, suite: Suite) -> Self {
        Self {
            title: title.into(),
            suite,
            scenarios: Vec::new(),
        }
    }

    fn push(&mut self, scenario: Scenario) {
        self.scenarios.push(scenario);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioMatrix {
    pub sections: Vec<Section>,
}

impl ScenarioMatrix {
    /// Anonymous-memory fault scenarios
    pub fn memory(config: &MemoryConfig) -> Self {
        let page = config.page_size;
        let mut sections = Vec::new();

        let mut s = Section::new("[Sequential Write] (Tests basic fault handling)", Suite::Memory);
        for &size in &config.sizes {
            s.push(Scenario::new("seq_write", PatternKind::Sequential, Access::Write, size, page));
        }
        sections.push(s);

        let mut s = Section::new("[Sequential Read] (Tests read-fault latency)", Suite::Memory);
        for &size in &config.sizes {
            s.push(Scenario::new("seq_read", PatternKind::Sequential, Access::Read, size, page));
        }
        sections.push(s);

        let mut s = Section::new(
            "[Stride Write] (Tests prefetch distance/aggressiveness)",
            Suite::Memory,
        );
        for k in config.strides.iter().filter_map(|&k| NonZeroUsize::new(k)) {
            s.push(Scenario::new(
                format!("stride_{}_pg", k),
                PatternKind::Stride(k),
                Access::Write,
                config.pattern_size,
                page,
            ));
        }
        sections.push(s);

        let mut s = Section::new("[Reverse Write] (Tests backward fault handling)", Suite::Memory);
        s.push(Scenario::new(
            "reverse_write",
            PatternKind::Reverse,
            Access::Write,
            config.pattern_size,
            page,
        ));
        sections.push(s);

        let mut s = Section::new("[Random Access] (Tests worst-case fault latency)", Suite::Memory);
        s.push(Scenario::new(
            "random_write",
            PatternKind::Random,
            Access::Write,
            config.pattern_size,
            page,
        ));
        sections.push(s);

        Self { sections }
    }

    /// File readahead scenarios over a fixture of `fixture_len` bytes
    pub fn file(config: &FileConfig, fixture_len: u64) -> Self {
        let block = config.block_size;
        let label = format_bytes(block as u64);
        let mut sections = Vec::new();

        let mut s = Section::new(
            format!("[Cold vs Hot Cache Sequential Read] ({} block)", label),
            Suite::File,
        );
        let read = |name: &str, kind: PatternKind| {
            Scenario::new(name, kind, Access::Read, fixture_len, block)
        };

        s.push(read("cold_cache_sequential", PatternKind::Sequential).cold());
        s.push(read("hot_cache_read (2nd pass)", PatternKind::HotCache));
        sections.push(s);

        let mut s = Section::new(
            format!("[Access Pattern Comparison] ({} block)", label),
            Suite::File,
        );
        s.push(read("sequential", PatternKind::Sequential).cold());
        s.push(read("random_read", PatternKind::Random).cold());
        s.push(read("reverse_sequential_read", PatternKind::Reverse).cold());
        sections.push(s);

        let mut s = Section::new(format!("[Stride Access Tests] ({} block)", label), Suite::File);
        for k in config.strides.iter().filter_map(|&k| NonZeroUsize::new(k)) {
            s.push(
                Scenario::new(
                    format!("stride_read (stride={})", format_bytes((k.get() * block) as u64)),
                    PatternKind::Stride(k),
                    Access::Read,
                    fixture_len,
                    block,
                )
                .cold(),
            );
        }
        sections.push(s);

        let mut s = Section::new("[Block Size Impact on Sequential Read]", Suite::File);
        for &bs in config.block_sizes.iter().filter(|&&bs| bs > 0) {
            s.push(
                Scenario::new(
                    format!("sequential (block={}B)", bs),
                    PatternKind::Sequential,
                    Access::Read,
                    fixture_len,
                    bs,
                )
                .cold(),
            );
        }
        sections.push(s);

        Self { sections }
    }

    pub fn scenario_count(&self) -> usize {
        self.sections.iter().map(|s| s.scenarios.len()).sum()
    }
}
