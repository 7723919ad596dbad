//! ib-queue: bounded-concurrency worker pool for conversion jobs.
//!
//! A fixed set of worker tasks pulls deferred jobs from a bounded channel.
//! Dispatch blocks only when the channel is at capacity (backpressure); job
//! failures are logged and never stop a worker.

pub mod pool;

pub use pool::{job, Job, WorkerPool};
