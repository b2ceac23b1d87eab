//! Bench command: compares push strategies against a simulated remote.

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use worksync_engine::{DiffSynchronizer, PushStrategy};
use worksync_remote::{MemoryRemoteStore, RemoteStore};

/// Timing of one strategy.
#[derive(Debug, Serialize)]
pub struct StrategyRun {
    /// Strategy name.
    pub strategy: String,
    /// Files pushed.
    pub files: usize,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u128,
    /// Highest number of concurrent remote calls.
    pub peak_in_flight: usize,
    /// Failed operations.
    pub failed: usize,
}

/// Runs the bench command.
pub fn run(
    files: usize,
    latency_ms: u64,
    concurrency: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let latency = Duration::from_millis(latency_ms);
    let strategies = [
        PushStrategy::Sequential,
        PushStrategy::Bounded(concurrency.max(1)),
        PushStrategy::Unbounded,
    ];

    let mut runs = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let run = runtime.block_on(measure(strategy, files, latency))?;
        tracing::debug!(strategy = %run.strategy, elapsed_ms = run.elapsed_ms, "Strategy measured");
        runs.push(run);
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&runs)?),
        _ => print_text_output(&runs, latency_ms),
    }
    Ok(())
}

/// Pushes `files` new files with `strategy` and times the whole diff.
pub async fn measure(
    strategy: PushStrategy,
    files: usize,
    latency: Duration,
) -> Result<StrategyRun, Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryRemoteStore::new());
    let folder = store.seed_folder(None, "bench");
    store.set_latency(latency);

    let local: Vec<(String, Bytes)> = (0..files)
        .map(|i| (format!("file-{i:04}.txt"), Bytes::from(format!("content {i}\n"))))
        .collect();

    let remote: Arc<dyn RemoteStore> = store.clone();
    let sync = DiffSynchronizer::new(remote, strategy);
    let start = Instant::now();
    let outcome = sync.sync(&folder, local).await?;
    let elapsed = start.elapsed();

    Ok(StrategyRun {
        strategy: strategy.to_string(),
        files,
        elapsed_ms: elapsed.as_millis(),
        peak_in_flight: store.peak_in_flight(),
        failed: outcome.failed.len(),
    })
}

fn print_text_output(runs: &[StrategyRun], latency_ms: u64) {
    println!("worksync Push Strategy Benchmark");
    println!("================================");
    println!();
    println!("Latency per call: {} ms", latency_ms);
    println!();
    println!("{:<14} {:>8} {:>12} {:>10} {:>8}", "Strategy", "Files", "Elapsed", "Peak", "Failed");
    for run in runs {
        println!(
            "{:<14} {:>8} {:>9} ms {:>10} {:>8}",
            run.strategy, run.files, run.elapsed_ms, run.peak_in_flight, run.failed
        );
    }
}
