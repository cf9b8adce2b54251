// ============================================================================
// BACKGROUND TASKS - Bounded pool for cache population and invalidation
// ============================================================================

use std::env;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, warn};

use crate::observability::{record_background_failure, set_background_pending};

struct Inner {
    semaphore: Arc<Semaphore>,
    pending: AtomicUsize,
    idle: Notify,
    concurrency: usize,
}

/// Fire-and-forget jobs that never block a response. At most `concurrency`
/// jobs run at once; the rest wait for a permit.
#[derive(Clone)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

/// Decrements the pending count even if the job panics
struct PendingGuard(Arc<Inner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let left = self.0.pending.fetch_sub(1, Ordering::AcqRel) - 1;
        set_background_pending(left);
        if left == 0 {
            self.0.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(concurrency)),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
                concurrency,
            }),
        }
    }

    /// `CACHE_BACKGROUND_CONCURRENCY`, default four jobs per CPU
    pub fn from_env() -> Self {
        let concurrency = env::var("CACHE_BACKGROUND_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| num_cpus::get() * 4);
        Self::new(concurrency)
    }

    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Jobs queued or running
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Run `job` in the background. Errors are logged and counted, never returned.
    pub fn spawn<F, E>(&self, name: &'static str, job: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let pending = self.inner.pending.fetch_add(1, Ordering::AcqRel) + 1;
        set_background_pending(pending);
        let guard = PendingGuard(self.inner.clone());
        let semaphore = self.inner.semaphore.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(task = name, error = %e, "❌ Background pool closed, job dropped");
                    record_background_failure(name);
                    return;
                }
            };

            match job.await {
                Ok(()) => debug!(task = name, "✅ Background job finished"),
                Err(e) => {
                    warn!(task = name, error = %e, "⚠️ Background job failed");
                    record_background_failure(name);
                }
            }
        });
    }

    /// Resolves once no job is queued or running
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Drain outstanding jobs for at most `timeout`; true when fully drained
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.wait_idle()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(pending = self.pending(), "⏱️ Background jobs still running at shutdown");
                false
            }
        }
    }
}
