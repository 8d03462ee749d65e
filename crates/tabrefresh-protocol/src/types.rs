use serde::{Deserialize, Serialize};

/// Browser tab identifier as assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(i64);

impl TabId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TabId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(TabId)
            .map_err(|_| format!("invalid tab id '{}'", s))
    }
}

/// Refresh strategy selected by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    #[default]
    Time,
    Conditional,
    Smart,
}

impl std::fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshMode::Time => write!(f, "time"),
            RefreshMode::Conditional => write!(f, "conditional"),
            RefreshMode::Smart => write!(f, "smart"),
        }
    }
}

impl std::str::FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "time" => Ok(RefreshMode::Time),
            "conditional" => Ok(RefreshMode::Conditional),
            "smart" => Ok(RefreshMode::Smart),
            other => Err(format!(
                "unknown refresh mode '{}' (expected time, conditional or smart)",
                other
            )),
        }
    }
}

/// Unit of a refresh interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Convert an interval expressed in this unit to milliseconds.
    pub fn to_millis(self, value: u64) -> u64 {
        match self {
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value.saturating_mul(1_000),
            TimeUnit::Minutes => value.saturating_mul(60_000),
            TimeUnit::Hours => value.saturating_mul(3_600_000),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Milliseconds => write!(f, "milliseconds"),
            TimeUnit::Seconds => write!(f, "seconds"),
            TimeUnit::Minutes => write!(f, "minutes"),
            TimeUnit::Hours => write!(f, "hours"),
        }
    }
}

impl std::str::FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ms" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "seconds" => Ok(TimeUnit::Seconds),
            "m" | "min" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hours" => Ok(TimeUnit::Hours),
            other => Err(format!("unknown time unit '{}'", other)),
        }
    }
}

/// Content predicate used by conditional refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    ContainsText,
    NotContainsText,
    TextChanged,
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionType::ContainsText => write!(f, "contains_text"),
            ConditionType::NotContainsText => write!(f, "not_contains_text"),
            ConditionType::TextChanged => write!(f, "text_changed"),
        }
    }
}

impl std::str::FromStr for ConditionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "contains_text" | "contains" => Ok(ConditionType::ContainsText),
            "not_contains_text" | "not_contains" => Ok(ConditionType::NotContainsText),
            "text_changed" | "changed" => Ok(ConditionType::TextChanged),
            other => Err(format!("unknown condition type '{}'", other)),
        }
    }
}

/// Weekdays on which a smart schedule is allowed to refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveDays {
    pub mon: bool,
    pub tue: bool,
    pub wed: bool,
    pub thu: bool,
    pub fri: bool,
    pub sat: bool,
    pub sun: bool,
}

impl ActiveDays {
    /// Build from short day names (`mon`, `tue`, ...). Unknown names are rejected.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        let mut days = ActiveDays::default();
        for name in names {
            match name.trim().to_lowercase().as_str() {
                "mon" | "monday" => days.mon = true,
                "tue" | "tuesday" => days.tue = true,
                "wed" | "wednesday" => days.wed = true,
                "thu" | "thursday" => days.thu = true,
                "fri" | "friday" => days.fri = true,
                "sat" | "saturday" => days.sat = true,
                "sun" | "sunday" => days.sun = true,
                "" => {}
                other => return Err(format!("unknown day '{}'", other)),
            }
        }
        Ok(days)
    }

    /// Whether the weekday (0 = Monday .. 6 = Sunday) is active.
    pub fn contains(&self, weekday_from_monday: u32) -> bool {
        match weekday_from_monday {
            0 => self.mon,
            1 => self.tue,
            2 => self.wed,
            3 => self.thu,
            4 => self.fri,
            5 => self.sat,
            6 => self.sun,
            _ => false,
        }
    }

    pub fn any(&self) -> bool {
        self.mon || self.tue || self.wed || self.thu || self.fri || self.sat || self.sun
    }

    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.mon, "mon"),
            (self.tue, "tue"),
            (self.wed, "wed"),
            (self.thu, "thu"),
            (self.fri, "fri"),
            (self.sat, "sat"),
            (self.sun, "sun"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// Per-tab refresh settings as sent by the UI.
///
/// Flat on the wire: only the fields relevant to the chosen mode are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub interval: u64,
    pub unit: TimeUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<ConditionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub active_days: ActiveDays,
    pub time_range_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub continue_iteration: bool,
    pub form_protection: bool,
    pub enable_resource_monitoring: bool,
    pub monitored_resources: Vec<String>,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: 30,
            unit: TimeUnit::Seconds,
            condition_type: None,
            condition_value: None,
            selector: None,
            active_days: ActiveDays::default(),
            time_range_enabled: false,
            start_time: None,
            end_time: None,
            continue_iteration: false,
            form_protection: false,
            enable_resource_monitoring: false,
            monitored_resources: Vec::new(),
        }
    }
}

/// Desired state in a `set_refresh_state` request. An active state starts
/// (or restarts) the tab; an inactive one stops it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshStateChange {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RefreshMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<RefreshSettings>,
}

/// Partial settings update for an active session.
///
/// Only non-scheduling fields may be applied live; the scheduling fields are
/// accepted on the wire so the daemon can reject them explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<TimeUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<ConditionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_days: Option<ActiveDays>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_iteration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_resource_monitoring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitored_resources: Option<Vec<String>>,
}

impl LiveSettingsPatch {
    /// Names of the scheduling fields this patch tries to change.
    pub fn scheduling_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.interval.is_some() {
            fields.push("interval");
        }
        if self.unit.is_some() {
            fields.push("unit");
        }
        if self.condition_type.is_some() {
            fields.push("condition_type");
        }
        if self.condition_value.is_some() {
            fields.push("condition_value");
        }
        if self.selector.is_some() {
            fields.push("selector");
        }
        if self.active_days.is_some() {
            fields.push("active_days");
        }
        if self.time_range_enabled.is_some() {
            fields.push("time_range_enabled");
        }
        if self.start_time.is_some() {
            fields.push("start_time");
        }
        if self.end_time.is_some() {
            fields.push("end_time");
        }
        fields
    }
}

/// Countdown snapshot for display. All zero for tabs without a countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    /// Whole seconds until the next refresh.
    pub remaining: u64,
    /// Whole seconds of the full interval.
    pub total: u64,
    pub unit: TimeUnit,
    /// Elapsed share of the interval, 0..=100.
    pub percentage: u8,
}

/// Read-only view of one tab's refresh state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshStateView {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RefreshMode>,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<RefreshSettings>,
    pub timer_info: TimerInfo,
}

/// Outcome of a conditional or smart evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub should_refresh: bool,
    pub reason: String,
}

impl CheckResult {
    pub fn refresh(reason: impl Into<String>) -> Self {
        Self {
            should_refresh: true,
            reason: reason.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            should_refresh: false,
            reason: reason.into(),
        }
    }
}

/// Tab metadata reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Monitoring toggles currently applied to a tab's content side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentScriptState {
    pub resource_monitoring: bool,
    pub monitored_resources: Vec<String>,
    pub form_protection: bool,
}

/// Global user preferences shared by every tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub show_notifications: bool,
    pub confirm_refresh: bool,
    pub default_interval: u64,
    pub enable_resource_monitoring: bool,
    pub resource_check_interval: u64,
    pub startup_refresh_mode: bool,
    pub language: String,
    pub enable_sound_effects: bool,
    pub enable_ticking_sound: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            show_notifications: true,
            confirm_refresh: true,
            default_interval: 30,
            enable_resource_monitoring: false,
            resource_check_interval: 5,
            startup_refresh_mode: true,
            language: "en".to_string(),
            enable_sound_effects: true,
            enable_ticking_sound: true,
        }
    }
}

/// Command delivered to a tab's content side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TabCommand {
    EnableFormProtection,
    DisableFormProtection,
    StartResourceMonitoring { resources: Vec<String> },
    StopResourceMonitoring,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_is_transparent_integer() {
        let json = serde_json::to_string(&TabId::new(42)).unwrap();
        assert_eq!(json, "42");
        let parsed: TabId = serde_json::from_str("-7").unwrap();
        assert_eq!(parsed.get(), -7);
    }

    #[test]
    fn test_time_unit_to_millis() {
        assert_eq!(TimeUnit::Milliseconds.to_millis(250), 250);
        assert_eq!(TimeUnit::Seconds.to_millis(5), 5_000);
        assert_eq!(TimeUnit::Minutes.to_millis(2), 120_000);
        assert_eq!(TimeUnit::Hours.to_millis(1), 3_600_000);
        assert_eq!(TimeUnit::Hours.to_millis(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_refresh_settings_missing_fields_use_defaults() {
        let settings: RefreshSettings = serde_json::from_str(r#"{"interval":5}"#).unwrap();
        assert_eq!(settings.interval, 5);
        assert_eq!(settings.unit, TimeUnit::Seconds);
        assert!(settings.condition_type.is_none());
        assert!(!settings.continue_iteration);
        assert!(!settings.active_days.any());
    }

    #[test]
    fn test_refresh_settings_conditional_wire_shape() {
        let json = r##"{
            "interval": 10,
            "unit": "minutes",
            "condition_type": "not_contains_text",
            "condition_value": "Sold out",
            "selector": "#stock"
        }"##;
        let settings: RefreshSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.unit, TimeUnit::Minutes);
        assert_eq!(settings.condition_type, Some(ConditionType::NotContainsText));
        assert_eq!(settings.selector.as_deref(), Some("#stock"));
    }

    #[test]
    fn test_active_days_from_names() {
        let days = ActiveDays::from_names(["mon", "Friday"]).unwrap();
        assert!(days.contains(0));
        assert!(days.contains(4));
        assert!(!days.contains(6));
        assert_eq!(days.names(), vec!["mon", "fri"]);
        assert!(ActiveDays::from_names(["funday"]).is_err());
    }

    #[test]
    fn test_live_patch_scheduling_fields() {
        let patch = LiveSettingsPatch {
            continue_iteration: Some(true),
            form_protection: Some(false),
            ..Default::default()
        };
        assert!(patch.scheduling_fields().is_empty());

        let patch = LiveSettingsPatch {
            interval: Some(5),
            selector: Some("#x".to_string()),
            ..Default::default()
        };
        assert_eq!(patch.scheduling_fields(), vec!["interval", "selector"]);
    }

    #[test]
    fn test_timer_info_default_is_zeroed() {
        let info = TimerInfo::default();
        assert_eq!(info.remaining, 0);
        assert_eq!(info.total, 0);
        assert_eq!(info.percentage, 0);
    }

    #[test]
    fn test_tab_command_tagging() {
        let json = serde_json::to_string(&TabCommand::StartResourceMonitoring {
            resources: vec!["https://cdn.example.com/app.js".to_string()],
        })
        .unwrap();
        assert!(json.contains(r#""action":"start_resource_monitoring""#));
        let json = serde_json::to_string(&TabCommand::EnableFormProtection).unwrap();
        assert_eq!(json, r#"{"action":"enable_form_protection"}"#);
    }

    #[test]
    fn test_global_settings_partial_json() {
        let settings: GlobalSettings =
            serde_json::from_str(r#"{"confirm_refresh":false,"default_interval":60}"#).unwrap();
        assert!(!settings.confirm_refresh);
        assert_eq!(settings.default_interval, 60);
        assert_eq!(settings.resource_check_interval, 5);
        assert_eq!(settings.language, "en");
    }
}
