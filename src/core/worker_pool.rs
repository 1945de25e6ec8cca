//! Bounded worker pool executing client calls off the tick thread.
//!
//! The pool spawns dedicated OS threads, each with its own single-threaded
//! tokio runtime. The tick thread submits jobs and later harvests results
//! without ever blocking.
//!
//! # Key Features
//!
//! - **Non-blocking harvest**: `is_ready`/`try_take` never wait
//! - **Best-effort cancellation**: queued jobs are skipped, running async jobs
//!   are dropped at their next await point, finished results are discarded
//! - **Panic capture**: a panicking job surfaces as [`PoolError::Internal`]
//! - **Blocking retrieval**: `retrieve` waits on a condvar, for hosts and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use tick_llm::config::WorkerPoolConfig;
//! use tick_llm::core::{QueryExecutor, WorkerPool};
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::new().with_worker_count(4), QueryExecutor)?;
//! let ticket = pool.submit(job, meta)?;
//! // ... later, once per tick
//! if let Some(outcome) = pool.try_take(&ticket) {
//!     // handle outcome
//! }
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RequesterId, Tick};

pub use native::WorkerPool;

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The task queue is full; no more tasks can be accepted.
    QueueFull,

    /// The operation timed out.
    Timeout,

    /// No result slot exists for the ticket.
    ResultNotFound,

    /// The task was cancelled before a result was produced.
    Cancelled,

    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (job panic, runtime construction failure, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "task queue is full"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::ResultNotFound => write!(f, "result not found"),
            Self::Cancelled => write!(f, "task was cancelled"),
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Handle to one submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Ticket {
    /// Pool-local sequence number.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket-{}", self.0)
    }
}

/// Metadata travelling with a job, used for log correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetadata {
    /// Unique id of this dispatch.
    pub request_id: Uuid,
    /// Requester the job was dispatched for.
    pub requester: RequesterId,
    /// Tick of submission.
    pub tick: Tick,
}

impl TaskMetadata {
    /// Metadata for a fresh dispatch.
    #[must_use]
    pub fn new(requester: RequesterId, tick: Tick) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            requester,
            tick,
        }
    }
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Currently executing tasks.
    pub active_tasks: u64,

    /// Tasks waiting in the queue.
    pub queued_tasks: u64,

    /// Tasks that produced a result.
    pub completed_tasks: u64,

    /// Tasks that panicked.
    pub failed_tasks: u64,

    /// Tasks skipped or interrupted by cancellation.
    pub cancelled_tasks: u64,

    /// Total tasks submitted.
    pub submitted_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub queued_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub cancelled_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: self.queued_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            cancelled_tasks: self.cancelled_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
        }
    }
}

/// A task submitted to the worker pool.
#[derive(Debug)]
pub(crate) struct WorkerTask<P> {
    /// The task payload to execute.
    pub payload: P,
    /// Task metadata.
    pub meta: TaskMetadata,
    /// Result slot key.
    pub ticket: Ticket,
}
