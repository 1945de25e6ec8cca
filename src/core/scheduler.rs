//! Per-tick admission and lifecycle of client requests.
//!
//! The host calls [`Scheduler::tick`] once per simulation tick. Every call
//! runs three phases in a fixed order:
//!
//! 1. **Harvest**: collect finished requests, run parsers, update retry state
//! 2. **Timeout**: cancel requests older than the configured wall-clock limit
//! 3. **Dispatch**: admit eligible requesters up to the per-tick and
//!    per-second caps, in priority-descending then id-ascending order
//!
//! The tick thread is the only writer of requester state. Workers only ever
//! see an immutable prompt and return a string or an error.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::util::{Clock, SystemClock};

use super::callbacks::panic_message;
use super::executor::{QueryExecutor, QueryJob};
use super::parser::default_json_parser;
use super::{
    ClientError, ErrorKind, ParseError, PoolError, PoolStats, RateWindow, Registry, RequesterId,
    RequesterStore, SchedulerError, TaskMetadata, Tick, Ticket, WorkerPool,
};

type QueryPool = WorkerPool<QueryJob, Result<String, ClientError>, QueryExecutor>;

/// Per-tick input from the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    /// Number of the tick being run.
    pub tick_number: Tick,
}

impl TickContext {
    /// Context for tick `tick_number`.
    #[must_use]
    pub const fn new(tick_number: Tick) -> Self {
        Self { tick_number }
    }
}

/// What one [`Scheduler::tick`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Finished requests collected in the harvest phase, whatever their outcome.
    pub harvested: usize,
    /// Harvested requests that ended in `query_error` or `parse_error`.
    pub failed: usize,
    /// Requests cancelled by the timeout phase.
    pub timed_out: usize,
    /// Requests submitted in the dispatch phase.
    pub dispatched: usize,
}

/// In-flight bookkeeping for one requester.
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    ticket: Ticket,
    request_id: Uuid,
    submitted_at: Instant,
    submitted_tick: Tick,
}

/// Outcome of a finished job, flattened to text or an error message.
type Outcome = Result<String, String>;

/// The scheduler. `W` is the host world, which stores the requesters.
pub struct Scheduler<W: RequesterStore> {
    registry: Registry<W>,
    pool: QueryPool,
    pending: BTreeMap<RequesterId, PendingRequest>,
    rate_window: RateWindow,
    clock: Arc<dyn Clock>,
    shut_down: bool,
}

impl<W: RequesterStore> Scheduler<W> {
    /// Build a scheduler on the system clock.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if the registry's configuration is
    /// invalid, `SchedulerError::Pool` if the worker pool cannot start.
    pub fn new(registry: Registry<W>) -> Result<Self, SchedulerError> {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    /// Build a scheduler reading wall-clock time from `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`Scheduler::new`].
    pub fn with_clock(registry: Registry<W>, clock: Arc<dyn Clock>) -> Result<Self, SchedulerError> {
        let config = registry.config();
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        let pool = WorkerPool::new(config.worker_pool_config(), QueryExecutor)?;

        info!(
            max_requests_per_tick = config.max_requests_per_tick,
            max_requests_per_second = config.max_requests_per_second,
            worker_pool_size = config.worker_pool_size,
            request_timeout_secs = config.request_timeout_secs,
            "Scheduler started"
        );

        Ok(Self {
            registry,
            pool,
            pending: BTreeMap::new(),
            rate_window: RateWindow::default(),
            clock,
            shut_down: false,
        })
    }

    /// Run one tick: harvest, then timeout, then dispatch.
    ///
    /// Never blocks. A no-op after [`shutdown`](Self::shutdown).
    pub fn tick(&mut self, world: &mut W, ctx: &TickContext) -> TickReport {
        let mut report = TickReport::default();
        if self.shut_down {
            return report;
        }

        self.harvest(world, ctx.tick_number, &mut report);
        self.expire(world, ctx.tick_number, &mut report);
        self.dispatch(world, ctx.tick_number, &mut report);

        debug!(
            tick = ctx.tick_number,
            harvested = report.harvested,
            failed = report.failed,
            timed_out = report.timed_out,
            dispatched = report.dispatched,
            in_flight = self.pending.len(),
            "Tick complete"
        );
        report
    }

    /// Cancel all in-flight work, stop the worker pool and make every later
    /// [`tick`](Self::tick) a no-op. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let discarded = self.pending.len();
        self.pending.clear();
        self.pool.shutdown();
        info!(discarded = discarded, "Scheduler shut down");
    }

    /// True once [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Number of requests in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// True if `id` has a request in flight.
    #[must_use]
    pub fn is_in_flight(&self, id: RequesterId) -> bool {
        self.pending.contains_key(&id)
    }

    /// In-flight requests whose result is already available for harvest.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.pending
            .values()
            .filter(|p| self.pool.is_ready(&p.ticket))
            .count()
    }

    /// Worker pool statistics.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// The registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry<W> {
        &self.registry
    }

    /// Mutable registry, for redefining names or swapping the client between ticks.
    pub fn registry_mut(&mut self) -> &mut Registry<W> {
        &mut self.registry
    }

    /// The configuration the scheduler was built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        self.registry.config()
    }

    fn harvest(&mut self, world: &mut W, tick: Tick, report: &mut TickReport) {
        let mut finished = Vec::new();
        self.pending.retain(|&id, request| match self.pool.try_take(&request.ticket) {
            Some(outcome) => {
                finished.push((id, *request, flatten(outcome)));
                false
            }
            None => true,
        });

        for (id, request, outcome) in finished {
            report.harvested += 1;

            let has_sink = world.has_sink(id);
            let Some(state) = world.requester_mut(id) else {
                debug!(
                    requester = id,
                    request_id = %request.request_id,
                    "Requester gone, discarding result"
                );
                continue;
            };
            // Released even without a sink, so a requester whose blackboard was
            // detached mid-flight can be dispatched again once one is attached.
            state.pending = false;
            if !has_sink {
                debug!(
                    requester = id,
                    request_id = %request.request_id,
                    "Sink gone, discarding result"
                );
                continue;
            }

            let response = match outcome {
                Ok(response) => response,
                Err(message) => {
                    debug!(requester = id, error = %message, "Query failed");
                    self.fail(world, id, ErrorKind::QueryError, &message, tick);
                    report.failed += 1;
                    continue;
                }
            };

            let latency = self
                .clock
                .now()
                .saturating_duration_since(request.submitted_at)
                .as_secs_f64();
            let parser_name = world
                .requester(id)
                .and_then(|s| s.parser_name().map(str::to_owned));
            let Some(sink) = world.sink_mut(id) else {
                continue;
            };

            let parsed = match parser_name.as_deref() {
                None => run_parser(|| default_json_parser(&response, sink)),
                Some(name) => match self.registry.parser(name) {
                    Some(parser) => run_parser(|| parser(&response, sink)),
                    None => {
                        let message = format!("Missing: parser '{name}'");
                        self.fail(world, id, ErrorKind::MissingDefinition, &message, tick);
                        continue;
                    }
                },
            };

            if let Err(message) = parsed {
                debug!(requester = id, error = %message, "Response rejected by parser");
                self.fail(world, id, ErrorKind::ParseError, &message, tick);
                report.failed += 1;
                continue;
            }

            if let Some(state) = world.requester_mut(id) {
                state.record_success();
            }
            debug!(
                requester = id,
                request_id = %request.request_id,
                submitted_tick = request.submitted_tick,
                latency_secs = latency,
                "Response harvested"
            );
            self.registry
                .callbacks()
                .fire_response(id, latency, response.len(), tick);
        }
    }

    fn expire(&mut self, world: &mut W, tick: Tick, report: &mut TickReport) {
        let now = self.clock.now();
        let timeout = self.config().request_timeout();
        let expired: Vec<RequesterId> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.submitted_at) > timeout)
            .map(|(&id, _)| id)
            .collect();

        for id in expired {
            let Some(request) = self.pending.remove(&id) else {
                continue;
            };
            self.pool.cancel(&request.ticket);
            report.timed_out += 1;

            match world.requester_mut(id) {
                Some(state) => state.pending = false,
                None => debug!(requester = id, "Timed-out requester gone, reporting only"),
            }

            let message = format!(
                "Query timed out after {:?}s",
                self.config().request_timeout_secs
            );
            warn!(
                requester = id,
                request_id = %request.request_id,
                submitted_tick = request.submitted_tick,
                "Query timed out"
            );
            self.fail(world, id, ErrorKind::Timeout, &message, tick);
        }
    }

    fn dispatch(&mut self, world: &mut W, tick: Tick, report: &mut TickReport) {
        let Some(client) = self.registry.client().cloned() else {
            if let Some(first) = world.requester_ids().into_iter().min() {
                self.fail(world, first, ErrorKind::NoClient, "No LLM client registered", tick);
            }
            return;
        };

        self.rate_window.prune(self.clock.now());

        let mut eligible: Vec<(RequesterId, i32)> = world
            .requester_ids()
            .into_iter()
            .filter(|id| !self.pending.contains_key(id))
            .filter_map(|id| {
                world
                    .requester(id)
                    .filter(|state| state.is_eligible(tick))
                    .map(|state| (id, state.priority))
            })
            .collect();
        eligible.sort_unstable_by_key(|&(id, priority)| (Reverse(priority), id));

        let max_per_tick = self.config().max_requests_per_tick;
        let max_per_second = self.config().max_requests_per_second;
        let mut dispatched: u32 = 0;

        for (id, _) in eligible {
            if dispatched >= max_per_tick || !self.rate_window.has_capacity(max_per_second) {
                break;
            }

            let Some(state) = world.requester(id) else {
                continue;
            };
            let missing = self.registry.missing_definitions(state);
            if !missing.is_empty() {
                let message = format!("Missing: {}", missing.join(", "));
                self.fail(world, id, ErrorKind::MissingDefinition, &message, tick);
                continue;
            }
            if !world.has_sink(id) {
                continue;
            }
            let Some(prompt) = self.registry.assemble_prompt(&*world, id, state) else {
                continue;
            };

            let prompt_size = prompt.size();
            let meta = TaskMetadata::new(id, tick);
            let request_id = meta.request_id;
            let job = QueryJob {
                client: Arc::clone(&client),
                prompt,
            };

            let ticket = match self.pool.submit(job, meta) {
                Ok(ticket) => ticket,
                Err(PoolError::QueueFull) => {
                    warn!(requester = id, tick = tick, "Worker queue full, deferring admission");
                    break;
                }
                Err(e) => {
                    warn!(requester = id, tick = tick, error = %e, "Submission rejected");
                    break;
                }
            };

            let submitted_at = self.clock.now();
            self.pending.insert(
                id,
                PendingRequest {
                    ticket,
                    request_id,
                    submitted_at,
                    submitted_tick: tick,
                },
            );
            self.rate_window.record(submitted_at);
            if let Some(state) = world.requester_mut(id) {
                state.pending = true;
                state.last_query_tick = tick;
            }

            debug!(
                requester = id,
                request_id = %request_id,
                %ticket,
                prompt_size = prompt_size,
                "Query dispatched"
            );
            self.registry.callbacks().fire_query(id, prompt_size, tick);
            dispatched += 1;
            report.dispatched += 1;
        }
    }

    /// Notify observers of a failure for `id`. Recoverable kinds also count
    /// against the requester's retry budget, if it still exists.
    fn fail(&self, world: &mut W, id: RequesterId, kind: ErrorKind, message: &str, tick: Tick) {
        if kind.is_recoverable() {
            if let Some(state) = world.requester_mut(id) {
                if state.record_failure(tick) {
                    debug!(
                        requester = id,
                        cooldown_until = state.cooldown_until,
                        "Retry budget exhausted, cooling down"
                    );
                }
            }
        }
        self.registry.callbacks().fire_error(id, kind, message, tick);
    }
}

impl<W: RequesterStore> std::fmt::Debug for Scheduler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("registry", &self.registry)
            .field("in_flight", &self.pending.len())
            .field("rate_window", &self.rate_window.len())
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

fn flatten(outcome: Result<Result<String, ClientError>, PoolError>) -> Outcome {
    match outcome {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(e.message().to_owned()),
        Err(e) => Err(e.to_string()),
    }
}

/// Run a parser, turning both its error and a panic into a message.
fn run_parser<F>(parse: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), ParseError>,
{
    match catch_unwind(AssertUnwindSafe(parse)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(format!("parser panicked: {}", panic_message(&*panic))),
    }
}
