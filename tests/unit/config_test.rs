//! Tests for configuration validation

use tick_llm::config::{SchedulerConfig, WorkerPoolConfig};

#[test]
fn test_scheduler_config_from_json_partial() {
    let cfg = SchedulerConfig::from_json_str(r#"{"max_requests_per_tick": 4, "request_timeout_secs": 2.5}"#)
        .expect("valid config");
    assert_eq!(cfg.max_requests_per_tick, 4);
    assert_eq!(cfg.max_requests_per_second, 5);
    assert_eq!(cfg.worker_pool_size, 4);
    assert!((cfg.request_timeout_secs - 2.5).abs() < f64::EPSILON);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("{").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{"max_requests_per_second": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str(r#"{"worker_pool_size": 0}"#).is_err());
}

#[test]
fn test_scheduler_config_invalid_timeout() {
    for timeout in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let cfg = SchedulerConfig {
            request_timeout_secs: timeout,
            ..SchedulerConfig::default()
        };
        assert!(cfg.validate().is_err(), "timeout {timeout} should be rejected");
    }
}

#[test]
fn test_scheduler_config_round_trips_through_json() {
    let cfg = SchedulerConfig {
        max_requests_per_tick: 2,
        max_requests_per_second: 8,
        worker_pool_size: 3,
        request_timeout_secs: 12.0,
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_worker_pool_config_validation() {
    let valid = WorkerPoolConfig::new().with_worker_count(2).with_max_queue_depth(8);
    assert!(valid.validate().is_ok());
    assert!(WorkerPoolConfig::new().worker_count >= 1);

    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_max_queue_depth(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_thread_stack_size(1024).validate().is_err());
}
