//! Wall-clock access
//!
//! The quota resets at local midnight, so anything that reasons about
//! "today" asks a [`Clock`] instead of calling `chrono::Local` directly.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use parking_lot::Mutex;
use std::time::Duration;

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    /// Current local date and time
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Time left until the next local midnight
    fn until_next_day(&self) -> Duration {
        let now = self.now();
        now.date()
            .succ_opt()
            .map(|tomorrow| tomorrow.and_time(NaiveTime::MIN) - now)
            .and_then(|delta| delta.to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

/// Clock backed by the operating system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Clock frozen at `now`
    #[must_use]
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock frozen at noon on `date`
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_time(NaiveTime::MIN) + TimeDelta::hours(12))
    }

    /// Move the clock forward
    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock() += delta;
    }

    /// Jump to an arbitrary instant
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fixed_clock_on_is_noon() {
        let clock = FixedClock::on(date(2024, 3, 9));
        assert_eq!(clock.today(), date(2024, 3, 9));
        assert_eq!(clock.until_next_day(), Duration::from_secs(12 * 3600));
    }

    #[test]
    fn test_advance_crosses_midnight() {
        let clock = FixedClock::on(date(2024, 12, 31));
        clock.advance(TimeDelta::hours(13));
        assert_eq!(clock.today(), date(2025, 1, 1));
        assert_eq!(clock.until_next_day(), Duration::from_secs(23 * 3600));
    }

    #[test]
    fn test_until_next_day_at_midnight_is_full_day() {
        let clock = FixedClock::new(date(2024, 1, 1).and_time(NaiveTime::MIN));
        assert_eq!(clock.until_next_day(), Duration::from_secs(86400));
    }

    #[test]
    fn test_system_clock_is_before_midnight() {
        assert!(SystemClock.until_next_day() <= Duration::from_secs(86400));
    }
}
