//! Time sources for date- and hour-scoped tokens.

use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};

/// Supplies the current local wall-clock time.
///
/// Token buckets are cut from this value, so tests inject a fixed clock
/// instead of reading the system time.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fixed_clock_stays_put() {
        let clock = FixedClock::new(at(10, 0));
        assert_eq!(clock.now(), at(10, 0));
        assert_eq!(clock.now(), at(10, 0));
    }

    #[test]
    fn fixed_clock_advances_and_sets() {
        let clock = FixedClock::new(at(10, 0));
        clock.advance(Duration::minutes(59));
        assert_eq!(clock.now(), at(10, 59));
        clock.set(at(3, 0));
        assert_eq!(clock.now(), at(3, 0));
    }
}
