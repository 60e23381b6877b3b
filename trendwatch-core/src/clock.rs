use chrono::{DateTime, Duration, Local, Utc};
use std::sync::{Mutex, PoisonError};

/// Source of the current instant. Everything time-dependent (key TTLs,
/// recency boosts, ranking windows, date keys) reads it through this trait.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date of `now()` on the process-local clock, `YYYY-MM-DD`.
    fn today_key(&self) -> String {
        date_key(self.now())
    }
}

pub fn date_key(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_date_key_uses_local_calendar_date() {
        let local_noon = Local.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
        assert_eq!(date_key(local_noon.with_timezone(&Utc)), "2024-09-01");

        let local_late = Local.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(date_key(local_late.with_timezone(&Utc)), "2024-12-31");
    }
}
