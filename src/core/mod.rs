//! Core scheduling abstractions: requester state, registry, worker pool and
//! the per-tick scheduler.

pub mod blackboard;
pub mod callbacks;
pub mod client;
pub mod error;
pub mod executor;
pub mod parser;
pub mod rate_limit;
pub mod registry;
pub mod requester;
pub mod scheduler;
pub mod store;
pub mod worker_pool;

pub use blackboard::Blackboard;
pub use callbacks::{CallbackBus, ErrorObserver, QueryObserver, ResponseObserver};
pub use client::{LlmClient, Prompt};
pub use error::{AppResult, ClientError, ErrorKind, ParseError, SchedulerError};
pub use executor::{QueryExecutor, QueryJob, WorkerExecutor};
pub use parser::{default_json_parser, strip_code_fences, ParserFn, STRATEGY_KEY};
pub use rate_limit::RateWindow;
pub use registry::{ContextFn, Registry};
pub use requester::{RequesterId, RequesterState, RequesterStatus, Tick};
pub use scheduler::{Scheduler, TickContext, TickReport};
pub use store::RequesterStore;
pub use worker_pool::{PoolError, PoolStats, TaskMetadata, Ticket, WorkerPool};
