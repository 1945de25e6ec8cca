//! Tests for utility functions

use std::time::{Duration, Instant};

use tick_llm::core::RateWindow;
use tick_llm::util::{init_tracing, Clock, ManualClock, SystemClock};

#[test]
fn test_system_clock_is_monotonic() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn test_manual_clock_drives_rate_window() {
    let clock = ManualClock::new();
    let mut window = RateWindow::new(Duration::from_secs(1));
    for _ in 0..3 {
        window.record(clock.now());
        clock.advance(Duration::from_millis(400));
    }
    // Stamps at 0, 400 and 800 ms; now is 1200 ms.
    window.prune(clock.now());
    assert_eq!(window.len(), 2);
    assert!(window.has_capacity(3));
    assert!(!window.has_capacity(2));
}

#[test]
fn test_rate_window_tolerates_clock_behind_stamps() {
    let mut window = RateWindow::default();
    let now = Instant::now();
    window.record(now + Duration::from_secs(5));
    window.prune(now);
    assert_eq!(window.len(), 1);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
