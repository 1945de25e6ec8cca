//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use tick_llm::builders::SchedulerBuilder;
use tick_llm::config::SchedulerConfig;
use tick_llm::core::{Registry, SchedulerError};
use tick_llm::infra::InMemoryStore;
use tick_llm::util::ManualClock;

#[test]
fn test_builder_uses_registry_config_by_default() {
    let registry: Registry<InMemoryStore> = Registry::new();
    let mut scheduler = SchedulerBuilder::new(registry).build().expect("build");
    assert_eq!(scheduler.config(), &SchedulerConfig::default());
    assert_eq!(scheduler.pool_stats().worker_count, 4);
    scheduler.shutdown();
}

#[test]
fn test_builder_config_override() {
    let registry: Registry<InMemoryStore> = Registry::new();
    let config = SchedulerConfig {
        worker_pool_size: 2,
        request_timeout_secs: 1.5,
        ..SchedulerConfig::default()
    };
    let scheduler = SchedulerBuilder::new(registry)
        .with_config(config.clone())
        .with_clock(Arc::new(ManualClock::new()))
        .build()
        .expect("build");
    assert_eq!(scheduler.config(), &config);
    assert_eq!(scheduler.config().request_timeout(), Duration::from_millis(1500));
    assert_eq!(scheduler.pool_stats().worker_count, 2);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let registry: Registry<InMemoryStore> = Registry::new();
    let err = SchedulerBuilder::new(registry)
        .with_config(SchedulerConfig {
            worker_pool_size: 0,
            ..SchedulerConfig::default()
        })
        .build()
        .expect_err("zero workers must be rejected");
    assert!(matches!(err, SchedulerError::InvalidConfig(msg) if msg.contains("worker_pool_size")));
}
