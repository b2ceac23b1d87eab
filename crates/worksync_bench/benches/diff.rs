//! Diff planning benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use worksync_bench::{numbered_files, remote_listing};
use worksync_engine::DiffPlan;

/// Benchmark planning against a remote that already holds every file.
fn bench_plan_mostly_unchanged(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_mostly_unchanged");

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let local = numbered_files(count);
            let remote = remote_listing(&local, 10);

            b.iter(|| {
                let plan = DiffPlan::plan(black_box(local.clone()), black_box(remote.clone()), true);
                black_box(plan);
            });
        });
    }

    group.finish();
}

/// Benchmark planning against an empty remote.
fn bench_plan_all_new(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_all_new");

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let local = numbered_files(count);

            b.iter(|| {
                let plan = DiffPlan::plan(black_box(local.clone()), Vec::new(), true);
                black_box(plan);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan_mostly_unchanged, bench_plan_all_new);
criterion_main!(benches);
