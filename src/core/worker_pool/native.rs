//! Native implementation of `WorkerPool` using OS threads.
//!
//! Each worker owns a single-threaded tokio runtime. Jobs are spawned onto it
//! and raced against their cancellation signal, so an async job can be dropped
//! mid-flight.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel recv; blocking retrieval uses a Condvar
//! - **Brief critical sections**: RwLock for the slot map, per-slot Mutex
//! - **Clean shutdown**: dropping the sender unblocks idle workers naturally

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::callbacks::panic_message;
use crate::core::executor::WorkerExecutor;
use crate::core::TaskMetadata;

use super::{PoolCounters, PoolError, PoolStats, Ticket, WorkerTask};

/// Result entry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultState {
    /// Waiting for result.
    Pending,
    /// Result is ready.
    Ready,
    /// Slot was cancelled; no result will arrive.
    Cancelled,
}

struct ResultEntry<R> {
    result: Option<Result<R, PoolError>>,
    state: ResultState,
}

/// One result slot: the entry, a condvar for blocking waiters and the
/// cancellation signal watched by the worker.
struct Slot<R> {
    entry: Mutex<ResultEntry<R>>,
    ready: Condvar,
    cancel: Arc<Notify>,
}

/// Result storage keyed by ticket.
struct ResultStorage<R> {
    entries: RwLock<HashMap<Ticket, Arc<Slot<R>>>>,
}

impl<R> ResultStorage<R> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a slot and return its cancellation signal.
    fn create_slot(&self, ticket: Ticket) -> Arc<Notify> {
        let cancel = Arc::new(Notify::new());
        let slot = Slot {
            entry: Mutex::new(ResultEntry {
                result: None,
                state: ResultState::Pending,
            }),
            ready: Condvar::new(),
            cancel: Arc::clone(&cancel),
        };
        self.entries.write().insert(ticket, Arc::new(slot));
        cancel
    }

    fn get(&self, ticket: &Ticket) -> Option<Arc<Slot<R>>> {
        self.entries.read().get(ticket).cloned()
    }

    fn contains(&self, ticket: &Ticket) -> bool {
        self.entries.read().contains_key(ticket)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Store a result and notify any waiters. Returns false if the slot is
    /// gone, in which case the result is dropped.
    fn store(&self, ticket: &Ticket, result: Result<R, PoolError>) -> bool {
        let Some(slot) = self.get(ticket) else {
            return false;
        };
        let mut entry = slot.entry.lock();
        if entry.state != ResultState::Pending {
            return false;
        }
        entry.result = Some(result);
        entry.state = ResultState::Ready;
        slot.ready.notify_all();
        true
    }

    fn is_ready(&self, ticket: &Ticket) -> bool {
        self.get(ticket)
            .is_some_and(|slot| slot.entry.lock().state == ResultState::Ready)
    }

    /// Take a ready result and drop its slot (non-blocking).
    fn try_take(&self, ticket: &Ticket) -> Option<Result<R, PoolError>> {
        let slot = self.get(ticket)?;
        let result = {
            let mut entry = slot.entry.lock();
            if entry.state != ResultState::Ready {
                return None;
            }
            entry.result.take()
        };
        self.entries.write().remove(ticket);
        result
    }

    /// Remove a slot, waking its worker and any blocking waiter.
    fn cancel(&self, ticket: &Ticket) -> bool {
        let Some(slot) = self.entries.write().remove(ticket) else {
            return false;
        };
        Self::mark_cancelled(&slot);
        true
    }

    /// Cancel every slot. Returns how many were removed.
    fn clear(&self) -> usize {
        let drained: Vec<_> = self.entries.write().drain().map(|(_, slot)| slot).collect();
        for slot in &drained {
            Self::mark_cancelled(slot);
        }
        drained.len()
    }

    fn mark_cancelled(slot: &Slot<R>) {
        let mut entry = slot.entry.lock();
        if entry.state == ResultState::Pending {
            entry.state = ResultState::Cancelled;
        }
        entry.result = None;
        slot.ready.notify_all();
        // notify_one stores a permit if the worker is not waiting yet.
        slot.cancel.notify_one();
    }

    /// Wait for a result with timeout (blocking).
    fn wait_for_result(&self, ticket: &Ticket, timeout: Duration) -> Result<R, PoolError> {
        let slot = self.get(ticket).ok_or(PoolError::ResultNotFound)?;
        let deadline = Instant::now() + timeout;
        let mut entry = slot.entry.lock();
        while entry.state == ResultState::Pending {
            if slot.ready.wait_until(&mut entry, deadline).timed_out() {
                break;
            }
        }
        match entry.state {
            ResultState::Ready => entry.result.take().unwrap_or(Err(PoolError::ResultNotFound)),
            ResultState::Cancelled => Err(PoolError::Cancelled),
            ResultState::Pending => Err(PoolError::Timeout),
        }
    }
}

/// Worker pool with dedicated OS threads.
///
/// # Design
///
/// - **No polling**: workers block on channel recv
/// - **Clean shutdown**: dropping the sender unblocks all idle workers
/// - **Lock-free counters**: atomics for statistics
pub struct WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Task sender (to workers). Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<WorkerTask<P>>>>,

    /// Result slots.
    results: Arc<ResultStorage<R>>,

    /// Pool statistics counters.
    counters: Arc<PoolCounters>,

    /// Shutdown flag.
    shutdown: Arc<AtomicBool>,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Ticket counter.
    ticket_counter: AtomicU64,

    _executor: std::marker::PhantomData<E>,
}

impl<P, R, E> WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Create a new worker pool and spawn `config.worker_count` threads.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidConfig` if the configuration is invalid,
    /// `PoolError::Internal` if a worker thread cannot be spawned.
    pub fn new(config: WorkerPoolConfig, executor: E) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (task_tx, task_rx) = bounded::<WorkerTask<P>>(config.max_queue_depth);
        let results = Arc::new(ResultStorage::new());
        let counters = Arc::new(PoolCounters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker = spawn_worker(
                worker_id,
                task_rx.clone(),
                Arc::clone(&results),
                Arc::clone(&counters),
                Arc::clone(&shutdown),
                executor.clone(),
                config.thread_stack_size,
            );
            match worker {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Dropping the sender lets already spawned workers exit.
                    shutdown.store(true, Ordering::Release);
                    return Err(PoolError::Internal(format!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(
            worker_count = config.worker_count,
            max_queue_depth = config.max_queue_depth,
            "WorkerPool initialized"
        );

        Ok(Self {
            config,
            task_tx: Mutex::new(Some(task_tx)),
            results,
            counters,
            shutdown,
            workers: Mutex::new(workers),
            ticket_counter: AtomicU64::new(0),
            _executor: std::marker::PhantomData,
        })
    }

    /// Submit a job. Never blocks; fails immediately if the queue is full.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the task queue is full
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    pub fn submit(&self, payload: P, meta: TaskMetadata) -> Result<Ticket, PoolError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let ticket = Ticket(self.ticket_counter.fetch_add(1, Ordering::Relaxed));
        self.results.create_slot(ticket);

        let task = WorkerTask {
            payload,
            meta,
            ticket,
        };

        let task_tx_guard = self.task_tx.lock();
        let Some(task_tx) = task_tx_guard.as_ref() else {
            self.results.cancel(&ticket);
            return Err(PoolError::PoolShutdown);
        };

        match task_tx.try_send(task) {
            Ok(()) => {
                self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                self.counters.queued_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(%ticket, "Task submitted to worker pool");
                Ok(ticket)
            }
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                self.results.cancel(&ticket);
                warn!("Worker pool queue is full");
                Err(PoolError::QueueFull)
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                self.results.cancel(&ticket);
                Err(PoolError::PoolShutdown)
            }
        }
    }

    /// True once the job behind `ticket` has produced a result.
    #[must_use]
    pub fn is_ready(&self, ticket: &Ticket) -> bool {
        self.results.is_ready(ticket)
    }

    /// Take a finished result without blocking.
    ///
    /// Returns `None` while the job is still queued or running, or if the
    /// ticket is unknown. A taken result frees its slot.
    #[must_use]
    pub fn try_take(&self, ticket: &Ticket) -> Option<Result<R, PoolError>> {
        self.results.try_take(ticket)
    }

    /// Cancel a job (best effort).
    ///
    /// A queued job is skipped, a running async job is dropped at its next
    /// await point, and a finished result is discarded. Returns false if the
    /// ticket was already harvested or cancelled.
    pub fn cancel(&self, ticket: &Ticket) -> bool {
        let removed = self.results.cancel(ticket);
        if removed {
            debug!(%ticket, "Task cancelled");
        }
        removed
    }

    /// Block until the result is available or `timeout` expires.
    ///
    /// The slot is released on any outcome.
    ///
    /// # Errors
    ///
    /// - `PoolError::Timeout` if no result arrived in time
    /// - `PoolError::Cancelled` if the job was cancelled while waiting
    /// - `PoolError::ResultNotFound` if the ticket is unknown
    /// - any error the job itself produced
    pub fn retrieve(&self, ticket: &Ticket, timeout: Duration) -> Result<R, PoolError> {
        let result = self.results.wait_for_result(ticket, timeout);
        self.results.cancel(ticket);
        result
    }

    /// Jobs submitted and not yet harvested or cancelled.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.results.len()
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.config.worker_count)
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting work and cancel everything outstanding. Never blocks.
    ///
    /// Idle workers exit as soon as the sender is dropped; busy workers exit
    /// after their current job is interrupted or finishes. Use
    /// [`join`](Self::join) to wait for them.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }
        let cancelled = self.results.clear();

        info!(cancelled = cancelled, "Worker pool shut down");
    }

    /// Wait up to `timeout` in total for worker threads to exit.
    ///
    /// Workers still running at the deadline are detached. Returns how many
    /// workers were joined.
    pub fn join(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut workers = self.workers.lock();
        let mut joined = 0;

        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let join_thread = thread::spawn(move || {
                let result = worker.join();
                let _ = tx.send(result.is_ok());
            });

            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(true) => {
                    debug!(worker_id = idx, "Worker joined successfully");
                    joined += 1;
                    let _ = join_thread.join();
                }
                Ok(false) => {
                    warn!(worker_id = idx, "Worker panicked");
                    let _ = join_thread.join();
                }
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                }
            }
        }

        joined
    }
}

impl<P, R, E> Drop for WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    fn drop(&mut self) {
        if !self.is_shut_down() {
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
        self.shutdown();
    }
}

/// Spawn a worker thread.
fn spawn_worker<P, R, E>(
    worker_id: usize,
    task_rx: Receiver<WorkerTask<P>>,
    results: Arc<ResultStorage<R>>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
    executor: E,
    stack_size: usize,
) -> std::io::Result<JoinHandle<()>>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    thread::Builder::new()
        .name(format!("tick-llm-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");

            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "Failed to create worker runtime");
                    return;
                }
            };

            // When the sender is dropped and the queue drained, recv returns Err.
            while let Ok(task) = task_rx.recv() {
                counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);

                if shutdown.load(Ordering::Acquire) {
                    debug!(worker_id = worker_id, "Worker shutting down, exiting");
                    break;
                }

                let WorkerTask {
                    payload,
                    meta,
                    ticket,
                } = task;

                let Some(cancel) = results.get(&ticket).map(|slot| Arc::clone(&slot.cancel))
                else {
                    counters.cancelled_tasks.fetch_add(1, Ordering::Relaxed);
                    debug!(worker_id = worker_id, %ticket, "Skipping cancelled task");
                    continue;
                };

                counters.active_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(
                    worker_id = worker_id,
                    %ticket,
                    request_id = %meta.request_id,
                    "Worker executing task"
                );

                let exec = executor.clone();
                let handle = rt.spawn(async move { exec.execute(payload, meta).await });
                let abort = handle.abort_handle();

                let outcome = rt.block_on(async {
                    tokio::select! {
                        joined = handle => Some(joined),
                        () = cancel.notified() => None,
                    }
                });

                counters.active_tasks.fetch_sub(1, Ordering::Relaxed);

                match outcome {
                    Some(Ok(result)) => {
                        counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                        if !results.store(&ticket, Ok(result)) {
                            debug!(worker_id = worker_id, %ticket, "Result discarded, slot gone");
                        }
                    }
                    Some(Err(join_err)) => {
                        counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                        let message = if join_err.is_panic() {
                            let payload = join_err.into_panic();
                            format!("worker task panicked: {}", panic_message(&*payload))
                        } else {
                            format!("worker task aborted: {join_err}")
                        };
                        warn!(worker_id = worker_id, %ticket, error = %message, "Task failed");
                        results.store(&ticket, Err(PoolError::Internal(message)));
                    }
                    None => {
                        abort.abort();
                        counters.cancelled_tasks.fetch_add(1, Ordering::Relaxed);
                        debug!(worker_id = worker_id, %ticket, "Task interrupted by cancellation");
                    }
                }
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}
