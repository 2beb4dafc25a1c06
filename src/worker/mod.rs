// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded worker pool that the parallel evaluator dispatches wave
//! tasks through: a fixed-depth queue in front of a `max_workers`-wide
//! dispatch semaphore, with an optional shared token-bucket limiter so
//! bursty waves can't overrun a downstream dependency's rate limit
//! (spec §4.7).

mod rate_limit;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;

pub use rate_limit::TokenBucket;

const DEFAULT_QUEUE_SIZE: usize = 256;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// One unit of work the pool can execute. `execute` consumes `self` so
/// a task can carry its own one-shot reply channel without the pool
/// needing to know its output type.
#[async_trait]
pub trait Task: Send + 'static {
    fn id(&self) -> &str;
    async fn execute(self: Box<Self>);
}

/// Wraps an arbitrary future as a `Task`, replying with its output over
/// `reply` once it completes. Backs `WorkerPool::spawn`.
struct FnTask<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    id: String,
    fut: F,
    reply: oneshot::Sender<F::Output>,
}

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(self: Box<Self>) {
        let this = *self;
        let output = this.fut.await;
        let _ = this.reply.send(output);
    }
}

/// Result of a non-blocking `submit`: either the task joined the
/// queue, or the queue was already at `queue_size` and the caller must
/// decide whether to retry, shed the work, or fall back to
/// `spawn`/`submit_and_wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Enqueued,
    QueueFull,
}

/// Bounds both pending-task depth (`queue_size`) and in-flight
/// concurrency (`max_workers`). A single dispatcher task drains the
/// queue and spawns each task in its own isolated tokio task gated by
/// the semaphore, so a panicking task doesn't take a worker slot down
/// with it.
pub struct WorkerPool {
    sender: mpsc::Sender<Box<dyn Task>>,
    semaphore: Arc<Semaphore>,
    limiter: Arc<RwLock<Option<Arc<TokenBucket>>>>,
    queue_size: usize,
    max_workers: usize,
    idle_timeout: Duration,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self::with_queue_size(max_workers, DEFAULT_QUEUE_SIZE)
    }

    pub fn with_queue_size(max_workers: usize, queue_size: usize) -> Self {
        let max_workers = max_workers.max(1);
        let queue_size = queue_size.max(1);
        let (sender, mut receiver) = mpsc::channel::<Box<dyn Task>>(queue_size);
        let semaphore = Arc::new(Semaphore::new(max_workers));
        let limiter: Arc<RwLock<Option<Arc<TokenBucket>>>> = Arc::new(RwLock::new(None));

        let dispatch_semaphore = semaphore.clone();
        let dispatch_limiter = limiter.clone();
        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                let permit = dispatch_semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("semaphore never closes");
                let bucket = dispatch_limiter.read().clone();
                tokio::spawn(async move {
                    if let Some(bucket) = bucket {
                        bucket.acquire().await;
                    }
                    task.execute().await;
                    drop(permit);
                });
            }
        });

        WorkerPool {
            sender,
            semaphore,
            limiter,
            queue_size,
            max_workers,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_rate_limit(self, limiter: Arc<TokenBucket>) -> Self {
        *self.limiter.write() = Some(limiter);
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Non-blocking enqueue (spec §4.7's `Submit`): reports `QueueFull`
    /// immediately instead of waiting for room.
    pub fn submit(&self, task: Box<dyn Task>) -> SubmitOutcome {
        match self.sender.try_send(task) {
            Ok(()) => SubmitOutcome::Enqueued,
            Err(_) => SubmitOutcome::QueueFull,
        }
    }

    /// Enqueues `fut` — waiting for queue room if it's currently full —
    /// and returns a handle to its result. This is the evaluator's
    /// everyday dispatch path (spec §4.7's `SubmitAndWait`): the
    /// backpressure wait and the reply hand-off both happen inside the
    /// returned task, so the caller can await it whenever it's ready.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let (reply, reply_rx) = oneshot::channel();
            let task: Box<dyn Task> = Box::new(FnTask {
                id: "evaluator-task".to_string(),
                fut,
                reply,
            });
            sender.send(task).await.expect("worker pool dispatcher task ended");
            reply_rx.await.expect("worker task dropped without replying")
        })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits, up to `idle_timeout`, for every in-flight permit to be
    /// released — i.e. for all dispatched tasks to have completed.
    /// Used for a graceful shutdown after the last wave has been
    /// dispatched.
    pub async fn drain(&self, max_workers: usize) {
        let acquire = self.semaphore.acquire_many(max_workers as u32);
        let _ = tokio::time::timeout(self.idle_timeout, acquire).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn caps_concurrent_tasks_at_max_workers() {
        let pool = WorkerPool::new(2);
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let concurrent = concurrent.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn({
                let pool_sender = pool.sender.clone();
                async move {
                    let (reply, reply_rx) = oneshot::channel();
                    let task: Box<dyn Task> = Box::new(FnTask {
                        id: "t".to_string(),
                        fut: async move {
                            let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            concurrent.fetch_sub(1, Ordering::SeqCst);
                        },
                        reply,
                    });
                    pool_sender.send(task).await.unwrap();
                    reply_rx.await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn spawn_waits_for_its_result() {
        let pool = WorkerPool::new(2);
        let result = pool.spawn(async { 1 + 1 }).await.unwrap();
        assert_eq!(result, 2);
    }

    #[tokio::test]
    async fn submit_reports_queue_full_once_the_bound_is_reached() {
        let pool = WorkerPool::with_queue_size(1, 1);
        struct Blocker;
        #[async_trait]
        impl Task for Blocker {
            fn id(&self) -> &str {
                "blocker"
            }
            async fn execute(self: Box<Self>) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
        // The dispatcher task hasn't been scheduled yet (nothing has
        // yielded), so the bounded channel fills strictly from these
        // two back-to-back submissions.
        assert_eq!(pool.submit(Box::new(Blocker)), SubmitOutcome::Enqueued);
        assert_eq!(pool.submit(Box::new(Blocker)), SubmitOutcome::QueueFull);
    }
}
