//! Supervised group for detached work.
//!
//! Work handed to [`BackgroundTasks::spawn`] runs on its own tokio task. Its
//! error or panic is logged here rather than lost, and callers (tests,
//! shutdown) can wait until nothing is in flight.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;
use tracing::{debug, error};

#[derive(Default)]
struct Inner {
    inflight: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count even if the supervised task is aborted.
struct InflightGuard(Arc<Inner>);

impl Drop for InflightGuard {
    fn drop(&mut self) {
        if self.0.inflight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `future` detached.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        self.inner.inflight.fetch_add(1, Ordering::SeqCst);
        let guard = InflightGuard(self.inner.clone());

        tokio::spawn(async move {
            let _guard = guard;
            match tokio::spawn(future).await {
                Ok(Ok(())) => debug!(task = %name, "Background task finished"),
                Ok(Err(e)) => error!(task = %name, error = format!("{:#}", e), "Background task failed"),
                Err(join_error) => error!(task = %name, error = %join_error, "Background task panicked"),
            }
        });
    }

    /// Number of supervised tasks still running.
    pub fn inflight(&self) -> usize {
        self.inner.inflight.load(Ordering::SeqCst)
    }

    /// Wait until no supervised task is running, including ones spawned
    /// by other supervised tasks while waiting.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inflight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
