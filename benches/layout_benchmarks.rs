/// Performance benchmarks for grouping, scheduling, and row stacking
///
/// Run with: cargo bench
///
/// These benchmarks track performance over time to detect regressions in
/// the hot paths: record insertion with dedup, schedule draining, and the
/// row-stacking sweep.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use readstack::block::Block;
use readstack::layout::{TrackLayout, Window};
use readstack::mapping::Mapping;
use readstack::read_group::ReadGroups;
use readstack::schedule::BlockSchedule;

/// Synthetic mappings spread over one reference
fn generate_mappings(count: usize, seed: u64) -> Vec<Mapping> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let start = rng.gen_range(1..1_000_000u32);
            let len = rng.gen_range(100..1_000u32);
            Mapping::new(0, start, start + len, rng.gen_bool(0.5), rng.gen_range(0..8))
                .with_id(i as u64)
        })
        .collect()
}

/// Benchmark: routing records into per-read groups with dedup
fn bench_group_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_insert");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.sample_size(10);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mappings = generate_mappings(size, 42);
            // A quarter as many reads as records, so groups see collisions
            let reads: Vec<String> = (0..size)
                .map(|i| format!("read{}", i % (size / 4).max(1)))
                .collect();

            b.iter(|| {
                let mut groups = ReadGroups::new();
                for (read, mapping) in reads.iter().zip(&mappings) {
                    groups.insert_record(read, *mapping);
                }
                black_box(groups.len())
            });
        });
    }

    group.finish();
}

/// Benchmark: draining a schedule left to right
fn bench_schedule_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule_drain");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.sample_size(10);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mappings = generate_mappings(size, 7);

            b.iter_with_setup(
                || {
                    let mut schedule = BlockSchedule::new();
                    schedule.extend(
                        mappings
                            .iter()
                            .map(|m| Block::new(m.start, m.stop, m.id, m.segments)),
                    );
                    schedule
                },
                |mut schedule| {
                    let mut drained = 0usize;
                    while let Some(block) = schedule.next_at_or_after(0) {
                        black_box(block.start);
                        drained += 1;
                    }
                    black_box(drained)
                },
            );
        });
    }

    group.finish();
}

/// Benchmark: the full clamp-schedule-stack pass for one window
fn bench_stack_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_rows");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.sample_size(10);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mappings = generate_mappings(size, 13);
            let window = Window::new(0, 1, 1_001_000);

            b.iter(|| {
                let layout = TrackLayout::build(black_box(&mappings), window, 1);
                black_box(layout.height())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_group_insert,
    bench_schedule_drain,
    bench_stack_rows
);

criterion_main!(benches);
