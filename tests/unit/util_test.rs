//! Tests for utility functions

use chrono::{NaiveDate, TimeDelta};
use specter_exec::util::{init_tracing, system_clock, Clock, ManualClock};

#[test]
fn test_manual_clock_crosses_midnight() {
    let start = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(23, 59, 59)
        .unwrap();
    let clock = ManualClock::new(start);
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());

    clock.advance(TimeDelta::seconds(2));
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
}

#[test]
fn test_system_clock_moves_forward() {
    let clock = system_clock();
    let first = clock.now();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(clock.now() >= first);
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing();
    init_tracing();
    tracing::info!("subscriber installed");
}
