//! # Tick LLM
//!
//! An asynchronous query admission-and-lifecycle scheduler for deterministic,
//! tick-driven simulations.
//!
//! A simulation loop runs on a single thread and must never block, yet its
//! entities want to ask slow, fallible, externally-serviced questions (LLM
//! calls, remote planners, anything string-in/string-out). This crate sits
//! between the two: once per tick the host hands the [`core::Scheduler`] its
//! world, and the scheduler harvests finished requests, expires stale ones and
//! admits new ones onto a bounded worker pool.
//!
//! ## Key Features
//!
//! - **Exactly-once in flight**: a requester never has two outstanding requests
//! - **Deterministic admission**: priority descending, requester id ascending
//! - **Per-tick and per-second caps**: the second cap is a wall-clock sliding window
//! - **Retry budget and cooldown**: repeated failures park a requester for a while
//! - **Wall-clock timeouts**: enforced even when the tick rate stalls
//! - **Isolated observers**: a failing callback never disturbs the scheduler
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tick_llm::core::{Registry, RequesterState, Scheduler, TickContext};
//! use tick_llm::infra::client::MockClient;
//! use tick_llm::infra::store::InMemoryStore;
//!
//! let mut registry = Registry::new();
//! registry.define_role("scout", "You scout the frontier.");
//! registry.define_personality("curious", "You are curious.");
//! registry.define_context("surroundings", |_world: &InMemoryStore, id| {
//!     format!("Entity {id} sees nothing unusual.")
//! });
//! registry.register_client(MockClient::new());
//!
//! let mut world = InMemoryStore::new();
//! let id = world.spawn();
//! world.attach_requester(id, RequesterState::new("scout", "curious", "surroundings"));
//! world.attach_blackboard(id, Default::default());
//!
//! let mut scheduler = Scheduler::new(registry)?;
//! for tick in 1..=100 {
//!     scheduler.tick(&mut world, &TickContext::new(tick));
//! }
//! scheduler.shutdown();
//! ```
//!
//! For complete scenarios, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: registry, requester state, worker pool, scheduler.
pub mod core;
/// Configuration models for the scheduler and its worker pool.
pub mod config;
/// Builders to construct a scheduler from a registry.
pub mod builders;
/// Infrastructure adapters: reference clients and requester stores.
pub mod infra;
/// Shared utilities.
pub mod util;
