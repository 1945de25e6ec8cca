//! Builders to construct a scheduler from a registry.

pub mod scheduler_builder;

pub use scheduler_builder::SchedulerBuilder;
