//! Property-based tests for traversal orders and result aggregation
//!
//! Properties covered:
//! 1. Every pattern stays inside the region
//! 2. Sequential, reverse and random visit each unit exactly once
//! 3. Stride visits ceil(n / k) units at multiples of k
//! 4. Permutations are reproducible for a seed
//! 5. Averaged results never exceed the largest trial

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;
use readahead_bench::counter::Metric;
use readahead_bench::pattern::{permutation, Access, AccessPattern};
use readahead_bench::report::{format_bytes, RepetitionResult, TrialResult};
use readahead_bench::scenario::{PatternKind, Scenario};

fn all_patterns(units: usize, stride: usize, seed: u64) -> Vec<AccessPattern> {
    vec![
        AccessPattern::Sequential,
        AccessPattern::stride(stride).unwrap(),
        AccessPattern::Reverse,
        AccessPattern::random(permutation(units, seed).into()),
        AccessPattern::HotCache,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_patterns_stay_in_bounds(
        units in 0usize..2048,
        stride in 1usize..64,
        seed in any::<u64>(),
    ) {
        for p in all_patterns(units, stride, seed) {
            let order: Vec<_> = p.order(units).collect();
            prop_assert!(order.iter().all(|&i| i < units));
            prop_assert_eq!(order.len(), p.visit_count(units));
        }
    }

    #[test]
    fn prop_full_patterns_visit_each_unit_once(units in 0usize..2048, seed in any::<u64>()) {
        let patterns = [
            AccessPattern::Sequential,
            AccessPattern::Reverse,
            AccessPattern::random(permutation(units, seed).into()),
        ];
        for p in patterns {
            let seen: HashSet<_> = p.order(units).collect();
            prop_assert_eq!(seen.len(), units);
            prop_assert_eq!(p.order(units).count(), units);
        }
    }

    #[test]
    fn prop_stride_visits_multiples(units in 0usize..4096, stride in 1usize..128) {
        let p = AccessPattern::stride(stride).unwrap();
        let order: Vec<_> = p.order(units).collect();
        prop_assert_eq!(order.len(), units.div_ceil(stride));
        for (n, &i) in order.iter().enumerate() {
            prop_assert_eq!(i, n * stride);
        }
    }

    #[test]
    fn prop_reverse_is_sequential_reversed(units in 0usize..1024) {
        let mut fwd: Vec<_> = AccessPattern::Sequential.order(units).collect();
        fwd.reverse();
        let rev: Vec<_> = AccessPattern::Reverse.order(units).collect();
        prop_assert_eq!(fwd, rev);
    }

    #[test]
    fn prop_permutation_deterministic(units in 0usize..1024, seed in any::<u64>()) {
        prop_assert_eq!(permutation(units, seed), permutation(units, seed));
    }

    #[test]
    fn prop_mismatched_permutation_rejected(units in 1usize..512, extra in 1usize..16) {
        let p = AccessPattern::random(permutation(units + extra, 0).into());
        prop_assert!(p.check(units).is_err());
        prop_assert!(p.check(units + extra).is_ok());
    }

    #[test]
    fn prop_mean_bounded_by_trials(
        samples in prop::collection::vec((0u64..1_000_000, 0u64..100_000), 1..6),
    ) {
        let scenario =
            Scenario::new("seq_write", PatternKind::Sequential, Access::Write, 1 << 20, 4096);
        let trials: Vec<_> = samples
            .iter()
            .map(|&(us, aux)| TrialResult {
                duration: Duration::from_micros(us),
                aux_count: aux,
                visited: 256,
                clamped: false,
            })
            .collect();
        let r = RepetitionResult::from_trials(&scenario, Metric::PageFaults, &trials);

        let max_us = samples.iter().map(|s| s.0).max().unwrap();
        let min_us = samples.iter().map(|s| s.0).min().unwrap();
        let max_aux = samples.iter().map(|s| s.1).max().unwrap();
        prop_assert!(r.duration <= Duration::from_micros(max_us));
        prop_assert!(r.duration >= Duration::from_micros(min_us));
        prop_assert!(r.aux_count <= max_aux);
        prop_assert_eq!(r.trials, samples.len());
        prop_assert!(r.throughput_mib_s >= 0.0);
        prop_assert!(!r.failed);
    }

    #[test]
    fn prop_format_bytes_never_empty(bytes in any::<u64>()) {
        let label = format_bytes(bytes);
        prop_assert!(label.ends_with('B'));
        prop_assert!(label.chars().next().unwrap().is_ascii_digit());
    }
}
