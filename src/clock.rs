use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Source of "now" for everything that compares against wall time:
/// expiry checks and analytics window cutoffs.
///
/// Handlers reach the clock through the app state, so tests can pin
/// time with [`FixedClock`] instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Midnight UTC of the calendar day containing `instant`.
pub fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Midnight UTC of the day `n` days before the clock's today.
pub fn days_ago(clock: &dyn Clock, n: i64) -> DateTime<Utc> {
    start_of_day(clock.now() - Duration::days(n))
}
