//! Fixed-size pool of async workers draining a bounded job queue.
//!
//! The HTTP layer uses the pool for writes that must not delay a response,
//! such as view and download counters. Jobs are plain futures:
//!
//! ```rust,ignore
//! let pool = AsyncWorkerPool::new(WorkerPoolConfig::default());
//! let resources = services.resources.clone();
//! pool.try_submit(async move {
//!     if let Err(err) = resources.record_view(id).await {
//!         tracing::warn!(error = %err, "failed to count view");
//!     }
//! })?;
//! ```
//!
//! Each job runs in its own task, so a panicking job is reported and counted
//! while its worker carries on with the next one.

use crate::error::{CoreError, CoreResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A unit of work.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 4;
/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Worker pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of worker tasks.
    pub workers: usize,
    /// Jobs that may wait in the queue before submitters are held back.
    pub queue_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl WorkerPoolConfig {
    /// Sets the number of workers.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Counters describing what the pool has done so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WorkerPoolStats {
    /// Jobs accepted into the queue.
    pub submitted: u64,
    /// Jobs that ran to completion.
    pub completed: u64,
    /// Jobs that panicked.
    pub panicked: u64,
    /// Jobs currently waiting in the queue.
    pub queued: usize,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// A fixed number of tokio tasks sharing one bounded queue.
///
/// Must be created inside a tokio runtime.
pub struct AsyncWorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    workers: usize,
    capacity: usize,
}

impl AsyncWorkerPool {
    /// Spawns the workers. Zero values in `config` are raised to 1.
    pub fn new(config: WorkerPoolConfig) -> Self {
        let workers = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let handles = (0..workers)
            .map(|index| {
                tokio::spawn(run_worker(
                    index,
                    Arc::clone(&receiver),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        info!(workers, capacity, "worker pool started");
        Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            counters,
            workers,
            capacity,
        }
    }

    fn sender(&self) -> CoreResult<mpsc::Sender<Job>> {
        self.sender
            .lock()
            .clone()
            .ok_or_else(|| CoreError::worker_pool("pool is shut down"))
    }

    /// Queues a job, waiting for space if the queue is full.
    pub async fn submit<F>(&self, job: F) -> CoreResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender()?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        if sender.send(Box::pin(job)).await.is_err() {
            self.counters.submitted.fetch_sub(1, Ordering::Relaxed);
            return Err(CoreError::worker_pool("pool is shut down"));
        }
        Ok(())
    }

    /// Queues a job, failing at once if the queue is full.
    pub fn try_submit<F>(&self, job: F) -> CoreResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender()?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        match sender.try_send(Box::pin(job)) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.counters.submitted.fetch_sub(1, Ordering::Relaxed);
                match err {
                    TrySendError::Full(_) => {
                        warn!(capacity = self.capacity, "worker queue full, job dropped");
                        Err(CoreError::worker_pool("queue is full"))
                    }
                    TrySendError::Closed(_) => Err(CoreError::worker_pool("pool is shut down")),
                }
            }
        }
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> WorkerPoolStats {
        let queued = self
            .sender
            .lock()
            .as_ref()
            .map(|s| s.max_capacity() - s.capacity())
            .unwrap_or(0);
        WorkerPoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            queued,
        }
    }

    /// Number of workers.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stops accepting jobs, runs everything already queued and waits for
    /// the workers to exit. Calling it again does nothing.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "worker task failed");
            }
        }
        let stats = self.stats();
        info!(
            completed = stats.completed,
            panicked = stats.panicked,
            "worker pool stopped"
        );
    }
}

impl std::fmt::Debug for AsyncWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncWorkerPool")
            .field("workers", &self.workers)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

async fn run_worker(
    index: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    counters: Arc<Counters>,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        match tokio::spawn(job).await {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) if err.is_panic() => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                let message = panic_message(err.into_panic());
                error!(worker = index, panic = %message, "job panicked");
            }
            Err(err) => {
                warn!(worker = index, error = %err, "job cancelled");
            }
        }
    }
    debug!(worker = index, "worker exiting");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn runs_submitted_jobs() {
        let pool = AsyncWorkerPool::new(WorkerPoolConfig::default().with_workers(3));
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let count = Arc::clone(&count);
            pool.submit(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }
        pool.shutdown().await;

        assert_eq!(count.load(Ordering::SeqCst), 50);
        let stats = pool.stats();
        assert_eq!(stats.submitted, 50);
        assert_eq!(stats.completed, 50);
        assert_eq!(stats.panicked, 0);
    }

    #[tokio::test]
    async fn panics_do_not_kill_workers() {
        let pool = AsyncWorkerPool::new(WorkerPoolConfig::default().with_workers(1));
        let count = Arc::new(AtomicUsize::new(0));

        pool.submit(async {
            panic!("boom");
        })
        .await
        .unwrap();
        for _ in 0..3 {
            let count = Arc::clone(&count);
            pool.submit(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }
        pool.shutdown().await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
        let stats = pool.stats();
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.completed, 3);
    }

    #[tokio::test]
    async fn try_submit_fails_when_full() {
        let pool = AsyncWorkerPool::new(
            WorkerPoolConfig::default()
                .with_workers(1)
                .with_queue_capacity(1),
        );
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        pool.try_submit(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
        })
        .unwrap();
        started_rx.await.unwrap();

        // The only worker is busy; one job fits in the queue.
        pool.try_submit(async {}).unwrap();
        assert_eq!(pool.stats().queued, 1);
        assert!(matches!(
            pool.try_submit(async {}),
            Err(CoreError::WorkerPool { .. })
        ));

        release_tx.send(()).unwrap();
        pool.shutdown().await;
        assert_eq!(pool.stats().completed, 2);
        assert_eq!(pool.stats().submitted, 2);
    }

    #[tokio::test]
    async fn shutdown_drains_and_refuses_new_jobs() {
        let pool = AsyncWorkerPool::new(WorkerPoolConfig::default().with_workers(2));
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let count = Arc::clone(&count);
            pool.try_submit(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert!(pool.is_shut_down());
        assert!(pool.try_submit(async {}).is_err());
        assert!(pool.submit(async {}).await.is_err());

        // Second shutdown is a no-op.
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn zero_sizes_are_raised() {
        let pool = AsyncWorkerPool::new(
            WorkerPoolConfig::default()
                .with_workers(0)
                .with_queue_capacity(0),
        );
        assert_eq!(pool.worker_count(), 1);
        pool.submit(async {}).await.unwrap();
        pool.shutdown().await;
        assert_eq!(pool.stats().completed, 1);
    }

    #[test]
    fn panic_messages() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7u8)), "non-string panic payload");
    }
}
