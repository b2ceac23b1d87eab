//! Configuration for the sync engine.

use crate::pool::PushStrategy;
use std::time::Duration;

/// Default quiescence window before a persist.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1100);

/// Default number of remote operations in flight per diff.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet period after the last mutation before a persist fires.
    pub debounce: Duration,
    /// How diff operations are fanned out.
    pub strategy: PushStrategy,
    /// Name of the remote root folder.
    pub root_folder: String,
    /// Project whose folder holds the workspace.
    pub project_name: String,
    /// Skip updates whose remote hash already matches the local content.
    pub skip_unchanged: bool,
    /// Backoff applied when a remote write fails.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration with the default settings.
    pub fn new() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            strategy: PushStrategy::Bounded(DEFAULT_CONCURRENCY),
            root_folder: "worksync".to_string(),
            project_name: "Default Project".to_string(),
            skip_unchanged: true,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the push strategy.
    pub fn with_strategy(mut self, strategy: PushStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Uses a bounded pool of `limit` concurrent operations.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.strategy = PushStrategy::Bounded(limit);
        self
    }

    /// Sets the remote root folder name.
    pub fn with_root_folder(mut self, name: impl Into<String>) -> Self {
        self.root_folder = name.into();
        self
    }

    /// Sets the project name.
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    /// Enables or disables skipping unchanged files.
    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.add_jitter = jitter;
        self
    }

    /// Returns `true` if another attempt is allowed after `failures`.
    pub fn allows_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // up to 25%
            let jitter = delay_secs * 0.25 * rand_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Cheap jitter source without an RNG dependency.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
