//! Tests for the registry, requester state and callback bus

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tick_llm::core::{
    default_json_parser, Blackboard, CallbackBus, ErrorKind, Registry, RequesterState,
    RequesterStatus, STRATEGY_KEY,
};

struct World;

#[test]
fn test_registry_remove_definitions() {
    let mut registry: Registry<World> = Registry::new();
    registry.define_role("guard", "You guard.");
    registry.define_personality("calm", "You are calm.");
    registry.define_context("gate", |_: &World, id| format!("gate {id}"));
    registry.define_parser("noop", |_: &str, _: &mut Blackboard| Ok(()));

    let state = RequesterState::new("guard", "calm", "gate").with_parser("noop");
    assert!(registry.missing_definitions(&state).is_empty());

    assert!(registry.remove_role("guard"));
    assert!(!registry.remove_role("guard"));
    assert!(registry.remove_personality("calm"));
    assert!(registry.remove_context("gate"));
    assert!(registry.remove_parser("noop"));
    assert_eq!(
        registry.missing_definitions(&state),
        vec!["role 'guard'", "personality 'calm'", "context 'gate'", "parser 'noop'"]
    );
    assert!(registry.assemble_prompt(&World, 1, &state).is_none());
}

#[test]
fn test_requester_lifecycle_status() {
    let mut state = RequesterState::new("r", "p", "c")
        .with_query_interval(5)
        .with_max_retries(2)
        .with_cooldown_ticks(4);
    assert_eq!(state.status(0), RequesterStatus::Idle);
    assert!(!state.is_eligible(4));
    assert!(state.is_eligible(5));

    state.pending = true;
    assert_eq!(state.status(5), RequesterStatus::Pending);
    assert!(!state.is_eligible(5));
    state.pending = false;

    assert!(!state.record_failure(10));
    assert!(state.record_failure(10));
    assert_eq!(state.cooldown_until, 14);
    assert_eq!(state.status(13), RequesterStatus::Cooling);
    assert!(!state.is_eligible(13));
    assert!(state.is_eligible(14));

    state.record_success();
    assert_eq!(state.consecutive_errors, 0);
    assert_eq!(state.cooldown_until, 14);
}

#[test]
fn test_default_parser_keeps_other_keys() {
    let mut bb = Blackboard::new();
    bb.insert("hp", json!(10));
    default_json_parser("{\"flee\": true}", &mut bb).unwrap();
    default_json_parser("```\n{\"toward\": \"cave\"}\n```", &mut bb).unwrap();
    assert_eq!(bb.get("hp"), Some(&json!(10)));
    assert_eq!(bb.get(STRATEGY_KEY), Some(&json!({"flee": true, "toward": "cave"})));

    assert!(default_json_parser("plain words", &mut bb).is_err());
    assert!(default_json_parser("42", &mut bb).is_err());
}

#[test]
fn test_callback_bus_runs_every_observer_in_order() {
    let mut bus = CallbackBus::new();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));

    let s = Arc::clone(&seen);
    bus.on_error(move |id, kind, _, _| {
        s.lock().push((1, id, kind));
        Ok(())
    });
    bus.on_error(|_, _, _, _| Err(anyhow::anyhow!("observer failed")));
    bus.on_error(|_, _, _, _| panic!("observer panicked"));
    let s = Arc::clone(&seen);
    bus.on_error(move |id, kind, _, _| {
        s.lock().push((4, id, kind));
        Ok(())
    });
    let c = Arc::clone(&calls);
    bus.on_query(move |_, _, _| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    bus.fire_error(7, ErrorKind::Timeout, "late", 3);
    bus.fire_query(7, 10, 3);
    bus.fire_response(7, 0.1, 2, 3);

    assert_eq!(
        seen.lock().as_slice(),
        &[(1, 7, ErrorKind::Timeout), (4, 7, ErrorKind::Timeout)]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bus.len(), 5);
    assert!(!bus.is_empty());
}
