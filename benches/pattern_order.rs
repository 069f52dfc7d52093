/// Unit-order generation overhead
///
/// The timed loop of every trial pulls indices from a pattern iterator, so
/// the iterator itself must stay negligible next to a page fault or a read.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use readahead_bench::pattern::{permutation, AccessPattern, DEFAULT_SEED};

fn bench_unit_order(c: &mut Criterion) {
    let units = 65536;
    let mut group = c.benchmark_group("unit_order");
    group.throughput(Throughput::Elements(units as u64));

    let patterns = [
        ("sequential", AccessPattern::Sequential),
        ("stride_8", AccessPattern::stride(8).unwrap()),
        ("reverse", AccessPattern::Reverse),
        ("random", AccessPattern::random(permutation(units, DEFAULT_SEED).into())),
    ];
    for (name, pattern) in &patterns {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut acc = 0usize;
                for i in pattern.order(black_box(units)) {
                    acc = acc.wrapping_add(i);
                }
                black_box(acc)
            });
        });
    }

    group.finish();
}

fn bench_permutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("permutation");

    for units in [4096usize, 65536, 262144].iter() {
        group.throughput(Throughput::Elements(*units as u64));
        group.bench_with_input(BenchmarkId::from_parameter(units), units, |b, &units| {
            b.iter(|| permutation(black_box(units), DEFAULT_SEED));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_unit_order, bench_permutation);

criterion_main!(benches);
