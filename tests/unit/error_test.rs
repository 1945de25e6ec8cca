//! Tests for error types

use tick_llm::core::{ClientError, ErrorKind, ParseError, PoolError, SchedulerError};

#[test]
fn test_error_kind_names() {
    assert_eq!(ErrorKind::QueryError.as_str(), "query_error");
    assert_eq!(ErrorKind::ParseError.as_str(), "parse_error");
    assert_eq!(ErrorKind::Timeout.as_str(), "timeout");
    assert_eq!(ErrorKind::MissingDefinition.as_str(), "missing_definition");
    assert_eq!(ErrorKind::NoClient.as_str(), "no_client");
    assert_eq!(format!("{}", ErrorKind::Timeout), "timeout");
}

#[test]
fn test_error_kind_recoverability() {
    assert!(ErrorKind::QueryError.is_recoverable());
    assert!(ErrorKind::ParseError.is_recoverable());
    assert!(ErrorKind::Timeout.is_recoverable());
    assert!(!ErrorKind::MissingDefinition.is_recoverable());
    assert!(!ErrorKind::NoClient.is_recoverable());
}

#[test]
fn test_error_kind_serializes_snake_case() {
    let json = serde_json::to_string(&ErrorKind::MissingDefinition).unwrap();
    assert_eq!(json, "\"missing_definition\"");
}

#[test]
fn test_client_error_displays_message() {
    let err = ClientError::new("rate limited upstream");
    assert_eq!(format!("{}", err), "rate limited upstream");
    assert_eq!(err.message(), "rate limited upstream");
}

#[test]
fn test_parse_error_messages() {
    assert_eq!(
        ParseError::NotAnObject("string").to_string(),
        "expected JSON object, got string"
    );
    assert_eq!(ParseError::Custom("bad verb".into()).to_string(), "bad verb");

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(ParseError::from(json_err).to_string().starts_with("invalid JSON: "));
}

#[test]
fn test_scheduler_error_wraps_pool_error() {
    let err = SchedulerError::from(PoolError::InvalidConfig("worker_count must be greater than 0".into()));
    assert_eq!(
        format!("{}", err),
        "worker pool error: invalid configuration: worker_count must be greater than 0"
    );

    let err = SchedulerError::InvalidConfig("max_requests_per_tick must be greater than 0".into());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_requests_per_tick must be greater than 0"
    );
}
