use serde::{Deserialize, Serialize};
use tabrefresh_protocol::{TimeUnit, TimerInfo};

/// Timer state of one tab's countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    /// Epoch milliseconds of the next expected refresh.
    pub end_time_ms: i64,
    pub total_duration_ms: u64,
    pub unit: TimeUnit,
}

impl CountdownState {
    pub fn total_secs(&self) -> u64 {
        self.total_duration_ms.div_ceil(1000)
    }

    /// Whole seconds left, clamped to `0..=total_secs`.
    pub fn remaining_secs(&self, now_ms: i64) -> u64 {
        let left_ms = u64::try_from(self.end_time_ms.saturating_sub(now_ms)).unwrap_or(0);
        left_ms.div_ceil(1000).min(self.total_secs())
    }

    pub fn timer_info(&self, now_ms: i64) -> TimerInfo {
        let total = self.total_secs();
        let remaining = self.remaining_secs(now_ms);
        let percentage = if total == 0 {
            0
        } else {
            let elapsed = 1.0 - (remaining as f64 / total as f64);
            (100.0 * elapsed).round().clamp(0.0, 100.0) as u8
        };
        TimerInfo {
            remaining,
            total,
            unit: self.unit,
            percentage,
        }
    }
}
