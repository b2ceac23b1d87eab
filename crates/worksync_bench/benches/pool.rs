//! Push strategy benchmarks against a simulated remote.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use worksync_bench::{numbered_files, remote_with_folder};
use worksync_engine::{DiffSynchronizer, PushStrategy};
use worksync_remote::RemoteStore;

const FILES: usize = 40;
const LATENCY: Duration = Duration::from_millis(2);

/// Benchmark a full push of new files per strategy.
fn bench_push_strategies(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("push_strategy");
    group.sample_size(10);

    let strategies = [
        PushStrategy::Sequential,
        PushStrategy::Bounded(5),
        PushStrategy::Bounded(10),
        PushStrategy::Unbounded,
    ];

    for strategy in strategies {
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy),
            &strategy,
            |b, &strategy| {
                b.to_async(&runtime).iter(|| async move {
                    let (store, folder) = remote_with_folder(LATENCY);
                    let remote: std::sync::Arc<dyn RemoteStore> = store;
                    let outcome = DiffSynchronizer::new(remote, strategy)
                        .sync(&folder, numbered_files(FILES))
                        .await
                        .unwrap();
                    assert!(outcome.success());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_push_strategies);
criterion_main!(benches);
