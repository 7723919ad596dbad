//! The [`WorkerPool`] executes deferred jobs with bounded concurrency.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ib_core::{Error, Result};

/// One deferred, fire-and-forget unit of work.
///
/// Ownership transfers into the pool at dispatch; the pool owns the job until
/// its future completes. A failed job is terminal -- the pool never retries.
pub type Job = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Box a future into a [`Job`].
pub fn job<F>(fut: F) -> Job
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    Box::pin(fut)
}

/// Fixed-size pool of worker tasks fed by a bounded queue.
///
/// Workers are spawned at construction and run until the pool is shut down
/// or dropped. The queue bound is the admission control: once it is full,
/// [`WorkerPool::dispatch`] blocks the caller until a slot frees, rather than
/// dropping work.
pub struct WorkerPool {
    tx: mpsc::Sender<Job>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` worker tasks sharing a queue of `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `workers` or `capacity` is zero.
    pub fn new(workers: usize, capacity: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Validation("worker count must be at least 1".into()));
        }
        if capacity == 0 {
            return Err(Error::Validation("queue capacity must be at least 1".into()));
        }

        let (tx, rx) = mpsc::channel::<Job>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let cancel = CancellationToken::new();

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = rx.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                run_worker(id, rx, cancel).await;
            }));
        }

        Ok(Self {
            tx,
            cancel,
            handles,
        })
    }

    /// Submit a job for asynchronous execution.
    ///
    /// Returns once the job is accepted into the queue. Blocks only while the
    /// queue is at capacity. The eventual outcome of the job is observable
    /// through logs, never through this call.
    pub async fn dispatch(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| Error::Internal("worker pool is shut down".into()))
    }

    /// Stop the workers and wait for them to finish.
    ///
    /// Jobs already executing run to completion; queued jobs that no worker
    /// has picked up yet are discarded.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        tracing::info!("Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // An abandoned pool must not leak workers: cancelling wakes any
        // worker parked on an empty queue so it can exit.
        self.cancel.cancel();
    }
}

/// Single worker loop: pull the next job and run it.
///
/// Exits when the pool is cancelled or the queue closes. A failing job is
/// logged and the loop keeps going -- one bad conversion never stops the pool.
async fn run_worker(
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    cancel: CancellationToken,
) {
    tracing::debug!(worker = id, "Worker started");

    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = async {
                let mut guard = rx.lock().await;
                guard.recv().await
            } => job,
        };

        match job {
            Some(job) => {
                if let Err(e) = job.await {
                    tracing::error!(worker = id, error = %e, "Job failed");
                }
            }
            None => break,
        }
    }

    tracing::debug!(worker = id, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    /// Poll until `check` returns true or the deadline passes.
    async fn wait_for(check: impl Fn() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[test]
    fn zero_workers_rejected() {
        // Both checks fail before any task is spawned, so no runtime needed.
        assert!(matches!(WorkerPool::new(0, 4), Err(Error::Validation(_))));
        assert!(matches!(WorkerPool::new(4, 0), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn dispatched_job_executes() {
        let pool = WorkerPool::new(2, 4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        pool.dispatch(job(async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .await
        .unwrap();

        wait_for(|| counter.load(Ordering::SeqCst) == 1).await;
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn failed_job_does_not_stop_pool() {
        let pool = WorkerPool::new(1, 4).unwrap();

        pool.dispatch(job(async {
            Err(Error::stage("pull", "intentional failure"))
        }))
        .await
        .unwrap();

        // The same single worker must still pick up the next job.
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        pool.dispatch(job(async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .await
        .unwrap();

        wait_for(|| counter.load(Ordering::SeqCst) == 1).await;
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_worker_count() {
        let pool = WorkerPool::new(2, 16).unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            let done = done.clone();
            pool.dispatch(job(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .await
            .unwrap();
        }

        wait_for(|| done.load(Ordering::SeqCst) == 6).await;
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn full_queue_applies_backpressure() {
        // One worker, one queue slot: a long job occupies the worker, a
        // second fills the queue, and a third dispatch must block until the
        // first job completes.
        let pool = WorkerPool::new(1, 1).unwrap();
        let release = Arc::new(Notify::new());

        let r = release.clone();
        pool.dispatch(job(async move {
            r.notified().await;
            Ok(())
        }))
        .await
        .unwrap();

        let r = release.clone();
        pool.dispatch(job(async move {
            r.notified().await;
            Ok(())
        }))
        .await
        .unwrap();

        let blocked = pool.dispatch(job(async { Ok(()) }));
        assert!(
            timeout(Duration::from_millis(100), blocked).await.is_err(),
            "dispatch should block while the queue is full"
        );

        // Free the worker; the blocked dispatch must now go through.
        release.notify_one();
        release.notify_one();
        timeout(Duration::from_secs(5), pool.dispatch(job(async { Ok(()) })))
            .await
            .expect("dispatch should proceed after a slot frees")
            .unwrap();

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_joins_workers() {
        let pool = WorkerPool::new(3, 4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        pool.dispatch(job(async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .await
        .unwrap();
        wait_for(|| counter.load(Ordering::SeqCst) == 1).await;
        pool.shutdown().await;
    }
}
