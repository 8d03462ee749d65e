//! Time source for countdowns and smart schedules.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Datelike, Local, Timelike, Utc};

/// Wall-clock and calendar readings used by the scheduler.
pub trait Clock: Send + Sync {
    /// Epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Local weekday, 0 = Monday .. 6 = Sunday.
    fn weekday(&self) -> u32;

    /// Local minutes since midnight, 0..1440.
    fn minutes_since_midnight(&self) -> u32;
}

/// The real system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn weekday(&self) -> u32 {
        Local::now().weekday().num_days_from_monday()
    }

    fn minutes_since_midnight(&self) -> u32 {
        let now = Local::now();
        now.hour() * 60 + now.minute()
    }
}

/// Clock that follows tokio's time source with a settable calendar position.
///
/// `now_ms` advances with `tokio::time`, so a paused runtime drives it
/// deterministically. Weekday and time of day stay where they were set.
#[derive(Debug)]
pub struct ManualClock {
    base_ms: i64,
    origin: tokio::time::Instant,
    weekday: AtomicU32,
    minutes: AtomicU32,
}

impl ManualClock {
    /// Start at `base_ms`, Monday 12:00.
    pub fn new(base_ms: i64) -> Self {
        Self {
            base_ms,
            origin: tokio::time::Instant::now(),
            weekday: AtomicU32::new(0),
            minutes: AtomicU32::new(12 * 60),
        }
    }

    pub fn set_weekday(&self, weekday_from_monday: u32) {
        self.weekday.store(weekday_from_monday % 7, Ordering::SeqCst);
    }

    pub fn set_time_of_day(&self, hour: u32, minute: u32) {
        self.minutes
            .store((hour % 24) * 60 + (minute % 60), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        let elapsed = self.origin.elapsed().as_millis();
        self.base_ms + i64::try_from(elapsed).unwrap_or(i64::MAX - self.base_ms)
    }

    fn weekday(&self) -> u32 {
        self.weekday.load(Ordering::SeqCst)
    }

    fn minutes_since_midnight(&self) -> u32 {
        self.minutes.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_clock_readings_in_range() {
        let clock = SystemClock;
        assert!(clock.now_ms() > 1_600_000_000_000);
        assert!(clock.weekday() < 7);
        assert!(clock.minutes_since_midnight() < 1440);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_clock_follows_paused_time() {
        let clock = ManualClock::new(1_000_000);
        assert_eq!(clock.now_ms(), 1_000_000);
        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now_ms(), 1_001_500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_clock_calendar() {
        let clock = ManualClock::new(0);
        clock.set_weekday(6);
        clock.set_time_of_day(9, 30);
        assert_eq!(clock.weekday(), 6);
        assert_eq!(clock.minutes_since_midnight(), 570);
    }
}
