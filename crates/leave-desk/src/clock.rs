use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Source of the current instant. Services never read the system time directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an instant that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Pin the clock to 09:00 UTC on the given date.
    pub fn on(date: NaiveDate) -> Self {
        let nine = date
            .and_hms_opt(9, 0, 0)
            .unwrap_or_else(|| date.and_time(NaiveTime::MIN));
        Self::new(nine.and_utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_request() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
        let clock = ManualClock::on(date);
        assert_eq!(clock.today(), date);

        clock.advance(Duration::hours(20));
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date")
        );
    }
}
