//! Bounded fan-out of remote operations.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// How the operations of one diff are fanned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStrategy {
    /// One operation at a time.
    Sequential,
    /// At most `n` operations in flight.
    Bounded(usize),
    /// Every operation at once.
    Unbounded,
}

impl PushStrategy {
    /// Maximum operations in flight, `None` when unbounded.
    #[must_use]
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::Sequential => Some(1),
            Self::Bounded(n) => Some(n.max(1)),
            Self::Unbounded => None,
        }
    }
}

impl std::fmt::Display for PushStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Bounded(n) => write!(f, "bounded:{n}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl FromStr for PushStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "unbounded" => Ok(Self::Unbounded),
            other => {
                let limit = other
                    .strip_prefix("bounded:")
                    .unwrap_or(other)
                    .parse::<usize>()
                    .map_err(|_| format!("unknown push strategy: {other}"))?;
                if limit == 0 {
                    return Err("concurrency limit must be at least 1".to_string());
                }
                Ok(Self::Bounded(limit))
            }
        }
    }
}

/// Runs async operations with at most `limit` in flight.
///
/// A permit is taken before an operation starts and released when its
/// future completes, so a slow operation never blocks the ones already
/// admitted.
#[derive(Debug, Clone)]
pub struct BoundedPool {
    permits: Option<Arc<Semaphore>>,
}

impl BoundedPool {
    /// Creates a pool for the given strategy.
    pub fn new(strategy: PushStrategy) -> Self {
        Self {
            permits: strategy.limit().map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Runs `f` over every item and returns the outputs in completion
    /// order. `on_complete` is called after each output.
    pub async fn run<I, F, Fut, T>(
        &self,
        items: I,
        mut on_complete: impl FnMut(&T),
        f: F,
    ) -> Vec<T>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut running: FuturesUnordered<_> = items
            .into_iter()
            .map(|item| {
                let permits = self.permits.clone();
                let fut = f(item);
                async move {
                    let _permit = match &permits {
                        Some(sem) => sem.acquire().await.ok(),
                        None => None,
                    };
                    fut.await
                }
            })
            .collect();

        let mut outputs = Vec::with_capacity(running.len());
        while let Some(output) = running.next().await {
            on_complete(&output);
            outputs.push(output);
        }
        outputs
    }
}
