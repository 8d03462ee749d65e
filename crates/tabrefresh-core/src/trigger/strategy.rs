//! Settings validation: the only way to obtain a [`Strategy`].

use std::time::Duration;

use tabrefresh_protocol::{RefreshMode, RefreshSettings};

use super::condition::Condition;
use super::errors::TriggerError;
use super::schedule::{Schedule, TimeWindow, parse_hhmm};

/// What a tick does before deciding to reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Time,
    Conditional(Condition),
    Smart(Schedule),
}

impl Strategy {
    pub fn mode(&self) -> RefreshMode {
        match self {
            Strategy::Time => RefreshMode::Time,
            Strategy::Conditional(_) => RefreshMode::Conditional,
            Strategy::Smart(_) => RefreshMode::Smart,
        }
    }
}

/// A strategy together with its fixed tick period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerPlan {
    pub strategy: Strategy,
    pub period: Duration,
}

impl TriggerPlan {
    pub fn period_ms(&self) -> u64 {
        self.period.as_millis() as u64
    }
}

/// Validate settings for `mode` and convert them into a plan.
///
/// # Errors
///
/// `TriggerError::InvalidSettings` when the interval is below one unit, a
/// conditional trigger lacks a type or value, or a smart trigger has no
/// active day or an unparseable time window.
pub fn plan(mode: RefreshMode, settings: &RefreshSettings) -> Result<TriggerPlan, TriggerError> {
    if settings.interval < 1 {
        return Err(TriggerError::invalid(format!(
            "interval must be at least 1 {}",
            settings.unit
        )));
    }
    let period = Duration::from_millis(settings.unit.to_millis(settings.interval));

    let strategy = match mode {
        RefreshMode::Time => Strategy::Time,
        RefreshMode::Conditional => Strategy::Conditional(condition_from(settings)?),
        RefreshMode::Smart => Strategy::Smart(schedule_from(settings)?),
    };

    Ok(TriggerPlan { strategy, period })
}

fn condition_from(settings: &RefreshSettings) -> Result<Condition, TriggerError> {
    let kind = settings
        .condition_type
        .ok_or_else(|| TriggerError::invalid("conditional refresh needs a condition_type"))?;

    let value = settings
        .condition_value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| TriggerError::invalid("conditional refresh needs a condition_value"))?;

    let selector = settings
        .selector
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok(Condition {
        kind,
        value: value.to_string(),
        selector,
    })
}

fn schedule_from(settings: &RefreshSettings) -> Result<Schedule, TriggerError> {
    if !settings.active_days.any() {
        return Err(TriggerError::invalid(
            "smart refresh needs at least one active day",
        ));
    }

    let window = if settings.time_range_enabled {
        let start = settings
            .start_time
            .as_deref()
            .ok_or_else(|| TriggerError::invalid("time range enabled but start_time is missing"))?;
        let end = settings
            .end_time
            .as_deref()
            .ok_or_else(|| TriggerError::invalid("time range enabled but end_time is missing"))?;
        let start = parse_hhmm("start_time", start)?;
        let end = parse_hhmm("end_time", end)?;
        if start > end {
            return Err(TriggerError::invalid(
                "start_time must not be later than end_time",
            ));
        }
        Some(TimeWindow { start, end })
    } else {
        None
    };

    Ok(Schedule {
        days: settings.active_days,
        window,
    })
}
