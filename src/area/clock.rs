use chrono::{DateTime, Utc};

/// Time source for cache expiry. Injected so TTL behaviour is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Drop sub-millisecond precision so timestamps survive a round trip through
/// the SQLite cache unchanged.
pub fn truncate_to_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t.timestamp_millis()).unwrap_or(t)
}

#[cfg(test)]
pub use manual::ManualClock;


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn truncation_keeps_milliseconds() {
        let t = Utc.timestamp_opt(1_740_000_000, 123_456_789).unwrap();
        let truncated = truncate_to_millis(t);
        assert_eq!(truncated.timestamp_millis(), t.timestamp_millis());
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(chrono::Duration::days(6));
        assert_eq!(clock.now(), start + chrono::Duration::days(6));
    }
}
