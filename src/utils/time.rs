//! Time utilities
//!
//! All deadline and window logic in the engine reads time through the
//! [`Clock`] trait so tests can pin the current instant.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock pinned to the given instant
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }

    /// Pin the clock to a specific instant
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

/// Parse a datetime string in ISO 8601 format
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Check if an instant falls within an inclusive window
pub fn is_between(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    now >= start && now <= end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DateTime<Utc> {
        parse_datetime("2024-01-15T12:00:00Z").unwrap()
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(base());
        assert_eq!(clock.now(), base());

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), base() + Duration::seconds(90));
    }

    #[test]
    fn test_is_between() {
        let start = base();
        let end = base() + Duration::hours(1);

        assert!(is_between(start, start, end));
        assert!(is_between(end, start, end));
        assert!(is_between(start + Duration::minutes(30), start, end));
        assert!(!is_between(start - Duration::seconds(1), start, end));
        assert!(!is_between(end + Duration::seconds(1), start, end));
    }

    #[test]
    fn test_parse_datetime() {
        assert!(parse_datetime("2024-01-15T12:00:00Z").is_some());
        assert!(parse_datetime("not a date").is_none());
    }
}
