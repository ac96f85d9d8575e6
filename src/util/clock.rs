//! Wall-clock abstraction used for record timestamps and log rotation.
//!
//! The pipeline never calls `Local::now()` directly; it asks a [`Clock`]. Tests
//! swap in a [`ManualClock`] to simulate midnight without waiting for it.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use parking_lot::Mutex;

/// Source of local wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock. Time only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward (or backward, for negative deltas).
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: NaiveDateTime) {
        *self.now.lock() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

/// Shared handle to the system clock.
#[must_use]
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn manual_clock_advances_across_midnight() {
        let clock = ManualClock::new(at(2024, 3, 9, 23, 59));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());

        clock.advance(TimeDelta::minutes(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(clock.now(), at(2024, 3, 10, 0, 1));
    }

    #[test]
    fn manual_clock_set_overrides() {
        let clock = ManualClock::new(at(2024, 1, 1, 0, 0));
        clock.set(at(2030, 6, 15, 12, 30));
        assert_eq!(clock.now(), at(2030, 6, 15, 12, 30));
    }

    #[test]
    fn system_clock_is_close_to_local_now() {
        let before = Local::now().naive_local();
        let observed = SystemClock.now();
        let after = Local::now().naive_local();
        assert!(observed >= before && observed <= after);
    }
}
