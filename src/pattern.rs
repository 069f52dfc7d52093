//! Access patterns
//!
//! A pattern only decides the order in which unit indices of a region are
//! visited. Whether a visit reads or writes is carried separately by
//! [`Access`], and what a "unit" is (a page or a file block) belongs to the
//! region.

use std::iter::{Rev, StepBy};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{BenchError, Result};

/// Seed used by the random-access scenarios unless configured otherwise
pub const DEFAULT_SEED: u64 = 0xDEAD_BEEF;

/// Whether a visited unit is read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Traversal order over the units of a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPattern {
    /// Units `0..n` in increasing order
    Sequential,
    /// Units `0, k, 2k, ...` below `n`
    Stride { units: NonZeroUsize },
    /// Units `n-1` down to `0`
    Reverse,
    /// A precomputed permutation of `0..n`
    Random { permutation: Arc<[usize]> },
    /// Sequential, measured after an untimed warming pass
    HotCache,
}

impl AccessPattern {
    pub fn stride(units: usize) -> Result<Self> {
        NonZeroUsize::new(units)
            .map(|units| AccessPattern::Stride { units })
            .ok_or_else(|| BenchError::Config("stride must be at least 1 unit".to_string()))
    }

    pub fn random(permutation: Arc<[usize]>) -> Self {
        AccessPattern::Random { permutation }
    }

    /// Whether the runner must warm the region before timing
    pub fn needs_warmup(&self) -> bool {
        matches!(self, AccessPattern::HotCache)
    }

    /// Check that the pattern can traverse a region of `units` units
    /// without leaving it
    pub fn check(&self, units: usize) -> Result<()> {
        if let AccessPattern::Random { permutation } = self {
            if permutation.len() != units {
                return Err(BenchError::PatternMismatch {
                    expected: units,
                    actual: permutation.len(),
                });
            }
        }
        Ok(())
    }

    /// Visit order over a region of `units` units
    pub fn order(&self, units: usize) -> UnitOrder<'_> {
        match self {
            AccessPattern::Sequential | AccessPattern::HotCache => UnitOrder::Forward(0..units),
            AccessPattern::Stride { units: k } => UnitOrder::Stride((0..units).step_by(k.get())),
            AccessPattern::Reverse => UnitOrder::Reverse((0..units).rev()),
            AccessPattern::Random { permutation } => UnitOrder::Permuted(permutation.iter()),
        }
    }

    /// Number of units a traversal of `units` units will visit
    pub fn visit_count(&self, units: usize) -> usize {
        match self {
            AccessPattern::Stride { units: k } => units.div_ceil(k.get()),
            AccessPattern::Random { permutation } => permutation.len(),
            _ => units,
        }
    }
}

/// Iterator over unit indices produced by [`AccessPattern::order`]
#[derive(Debug, Clone)]
pub enum UnitOrder<'a> {
    Forward(Range<usize>),
    Stride(StepBy<Range<usize>>),
    Reverse(Rev<Range<usize>>),
    Permuted(std::slice::Iter<'a, usize>),
}

impl Iterator for UnitOrder<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        match self {
            UnitOrder::Forward(it) => it.next(),
            UnitOrder::Stride(it) => it.next(),
            UnitOrder::Reverse(it) => it.next(),
            UnitOrder::Permuted(it) => it.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            UnitOrder::Forward(it) => it.size_hint(),
            UnitOrder::Stride(it) => it.size_hint(),
            UnitOrder::Reverse(it) => it.size_hint(),
            UnitOrder::Permuted(it) => it.size_hint(),
        }
    }
}

/// Fisher-Yates permutation of `0..units`, reproducible for a given seed
pub fn permutation(units: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..units).collect();
    shuffle(&mut indices, seed);
    indices
}

/// Like [`permutation`], but reports allocation failure instead of aborting
pub fn try_permutation(units: usize, seed: u64) -> Result<Arc<[usize]>> {
    let mut indices = Vec::new();
    indices
        .try_reserve_exact(units)
        .map_err(|_| BenchError::IndexBuffer { units })?;
    indices.extend(0..units);
    shuffle(&mut indices, seed);
    Ok(indices.into())
}

fn shuffle(indices: &mut [usize], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in (1..indices.len()).rev() {
        let j = rng.gen_range(0..=i);
        indices.swap(i, j);
    }
}
