//! Weekday and time-of-day gating for smart refresh.

use tabrefresh_protocol::{ActiveDays, CheckResult};

use crate::clock::Clock;

use super::errors::TriggerError;

/// Inclusive window in minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    pub fn contains(&self, minutes: u32) -> bool {
        minutes >= self.start && minutes <= self.end
    }
}

/// A validated smart schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub days: ActiveDays,
    pub window: Option<TimeWindow>,
}

impl Schedule {
    /// Whether a refresh is allowed right now.
    pub fn evaluate(&self, clock: &dyn Clock) -> CheckResult {
        if !self.days.contains(clock.weekday()) {
            return CheckResult::skip("Today is not an active day");
        }
        if let Some(window) = self.window
            && !window.contains(clock.minutes_since_midnight())
        {
            return CheckResult::skip(format!(
                "Outside active hours ({}-{})",
                format_minutes(window.start),
                format_minutes(window.end)
            ));
        }
        CheckResult::refresh("Within active schedule")
    }
}

/// Parse `HH:MM` (24h) into minutes since midnight.
pub fn parse_hhmm(field: &str, value: &str) -> Result<u32, TriggerError> {
    let invalid = || TriggerError::invalid(format!("{} '{}' is not a valid HH:MM time", field, value));

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

fn format_minutes(total: u32) -> String {
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn monday_only() -> ActiveDays {
        ActiveDays {
            mon: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("start_time", "00:00").unwrap(), 0);
        assert_eq!(parse_hhmm("start_time", "09:30").unwrap(), 570);
        assert_eq!(parse_hhmm("end_time", "23:59").unwrap(), 1439);
        assert!(parse_hhmm("end_time", "24:00").is_err());
        assert!(parse_hhmm("end_time", "12:60").is_err());
        assert!(parse_hhmm("end_time", "noon").is_err());
        assert!(parse_hhmm("end_time", "").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_day_is_skipped() {
        let clock = ManualClock::new(0);
        clock.set_weekday(1);
        let schedule = Schedule {
            days: monday_only(),
            window: None,
        };
        let result = schedule.evaluate(&clock);
        assert!(!result.should_refresh);
        assert_eq!(result.reason, "Today is not an active day");

        clock.set_weekday(0);
        assert!(schedule.evaluate(&clock).should_refresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_bounds_are_inclusive() {
        let clock = ManualClock::new(0);
        let schedule = Schedule {
            days: monday_only(),
            window: Some(TimeWindow {
                start: 9 * 60,
                end: 17 * 60,
            }),
        };

        clock.set_time_of_day(9, 0);
        assert!(schedule.evaluate(&clock).should_refresh);
        clock.set_time_of_day(17, 0);
        assert!(schedule.evaluate(&clock).should_refresh);
        clock.set_time_of_day(17, 1);
        let result = schedule.evaluate(&clock);
        assert!(!result.should_refresh);
        assert_eq!(result.reason, "Outside active hours (09:00-17:00)");
    }
}
