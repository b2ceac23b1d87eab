//! Stress helpers for worksync.
//!
//! These drive the engine and the diff synchronizer under heavy load
//! against the in-memory remote store.

use crate::fixtures::{numbered_files, EngineFixture, TEST_OWNER};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use worksync_engine::{ConsentDecision, DiffSynchronizer, PushStrategy, SessionState, SyncConfig};
use worksync_model::{FileTree, NodeKind};
use worksync_remote::MemoryRemoteStore;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
    /// Most remote calls in flight at once.
    pub peak_in_flight: usize,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration, peak_in_flight: usize) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
            peak_in_flight,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
        println!("Peak in flight: {}", self.peak_in_flight);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of files pushed, or edits made.
    pub operations: usize,
    /// Latency of every remote call.
    pub latency: Duration,
    /// Fan-out of diff operations.
    pub strategy: PushStrategy,
    /// Pause between edits.
    pub edit_interval: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            latency: Duration::from_millis(20),
            strategy: PushStrategy::Bounded(5),
            edit_interval: Duration::from_millis(50),
        }
    }
}

/// Pushes `config.operations` new files into an empty remote folder.
pub async fn stress_push(config: &StressConfig) -> StressTestResult {
    let remote = Arc::new(MemoryRemoteStore::with_latency(config.latency));
    let folder = remote.seed_folder(None, "stress");
    let sync = DiffSynchronizer::new(remote.clone(), config.strategy);

    let start = Instant::now();
    let outcome = sync
        .sync(&folder, numbered_files(config.operations))
        .await
        .expect("Stress folder is listable");
    let duration = start.elapsed();

    StressTestResult::new(
        outcome.created.len() + outcome.updated.len(),
        outcome.failed.len(),
        duration,
        remote.peak_in_flight(),
    )
}

/// Outcome of [`stress_workspace_edits`].
#[derive(Debug, Clone)]
pub struct EditStressReport {
    /// Edits applied.
    pub edits: usize,
    /// Remote create/update calls issued.
    pub remote_writes: u64,
    /// Session phase after settling.
    pub final_state: SessionState,
    /// The remote tree equals the session's value after settling.
    pub converged: bool,
}

/// Makes `config.operations` workspace edits, `config.edit_interval`
/// apart, against a slow remote, then waits for the engine to settle.
///
/// Meant for tests running on a paused clock.
pub async fn stress_workspace_edits(config: &StressConfig) -> EditStressReport {
    let fx = EngineFixture::with_config(
        ConsentDecision::Granted,
        SyncConfig::default().with_strategy(config.strategy),
    );
    let workspace = fx.engine.session::<FileTree>();
    fx.engine.connect(Some(TEST_OWNER)).await;
    fx.remote.set_latency(config.latency);
    fx.settle().await;
    fx.remote.reset_counters();

    for i in 0..config.operations {
        let name = format!("edit-{i:04}.md");
        workspace
            .try_update(|tree| {
                let path = tree.create("/", &name, NodeKind::File)?;
                tree.write(&path, format!("edit {i}\n"))
            })
            .expect("Fresh file name is free");
        tokio::time::sleep(config.edit_interval).await;
    }
    fx.settle().await;

    EditStressReport {
        edits: config.operations,
        remote_writes: fx.remote.calls().writes(),
        final_state: workspace.state(),
        converged: fx.remote_value::<FileTree>() == Some(workspace.value()),
    }
}
