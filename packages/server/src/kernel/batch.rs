//! Shared bounded-concurrency admission for generation work.
//!
//! Every unit acquires a permit from one process-wide pool before it runs,
//! whether it comes from a live dispatch or from resumption. Units are
//! spawned on their own tasks, so an error or panic in one never cancels
//! its siblings.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default number of units allowed to run at once.
pub const DEFAULT_CONCURRENCY: usize = 25;

/// One named unit of work.
pub struct BatchUnit {
    pub name: String,
    pub future: BoxFuture<'static, Result<()>>,
}

impl BatchUnit {
    pub fn new(name: impl Into<String>, future: BoxFuture<'static, Result<()>>) -> Self {
        Self {
            name: name.into(),
            future,
        }
    }
}

enum UnitOutcome {
    Finished(Result<()>),
    Panicked(String),
}

/// Outcome counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.panicked
    }
}

#[derive(Clone)]
pub struct BatchRunner {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl BatchRunner {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run every unit under the shared permit pool and wait for all of them.
    ///
    /// Must not be awaited from inside a unit that already holds a permit.
    pub async fn run(&self, description: &str, units: Vec<BatchUnit>) -> BatchReport {
        let mut report = BatchReport::default();
        if units.is_empty() {
            return report;
        }

        info!(batch = description, units = units.len(), capacity = self.capacity, "Starting batch");

        let mut set = JoinSet::new();

        for unit in units {
            let permits = self.permits.clone();
            set.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    // The unit runs on its own task so a panic surfaces as a JoinError here.
                    Ok(_permit) => match tokio::spawn(unit.future).await {
                        Ok(result) => UnitOutcome::Finished(result),
                        Err(join_error) => UnitOutcome::Panicked(join_error.to_string()),
                    },
                    Err(_) => UnitOutcome::Finished(Err(anyhow!("batch permit pool closed"))),
                };
                (unit.name, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, UnitOutcome::Finished(Ok(())))) => {
                    report.succeeded += 1;
                    debug!(batch = description, unit = %name, "Unit finished");
                }
                Ok((name, UnitOutcome::Finished(Err(e)))) => {
                    report.failed += 1;
                    warn!(batch = description, unit = %name, error = format!("{:#}", e), "Unit failed");
                }
                Ok((name, UnitOutcome::Panicked(message))) => {
                    report.panicked += 1;
                    error!(batch = description, unit = %name, error = %message, "Unit panicked");
                }
                Err(join_error) => {
                    report.panicked += 1;
                    error!(batch = description, error = %join_error, "Batch supervisor task failed");
                }
            }
        }

        info!(
            batch = description,
            succeeded = report.succeeded,
            failed = report.failed,
            panicked = report.panicked,
            "Batch complete"
        );
        report
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tracked_unit(name: String, current: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> BatchUnit {
        BatchUnit::new(
            name,
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed(),
        )
    }

    #[tokio::test]
    async fn test_never_exceeds_capacity() {
        let runner = BatchRunner::new(3);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let units = (0..20)
            .map(|i| tracked_unit(format!("unit-{}", i), current.clone(), peak.clone()))
            .collect();
        let report = runner.run("capacity", units).await;

        assert_eq!(report.succeeded, 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(runner.available(), 3);
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_isolated() {
        let runner = BatchRunner::new(2);
        let units = vec![
            BatchUnit::new("ok", async { Ok(()) }.boxed()),
            BatchUnit::new("err", async { Err(anyhow!("boom")) }.boxed()),
            BatchUnit::new(
                "panic",
                async {
                    if true {
                        panic!("unit exploded");
                    }
                    Ok(())
                }
                .boxed(),
            ),
            BatchUnit::new("ok-2", async { Ok(()) }.boxed()),
        ];

        let report = runner.run("isolation", units).await;

        assert_eq!(
            report,
            BatchReport {
                succeeded: 2,
                failed: 1,
                panicked: 1
            }
        );
        assert_eq!(runner.available(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = BatchRunner::default().run("empty", Vec::new()).await;
        assert_eq!(report.total(), 0);
    }
}
