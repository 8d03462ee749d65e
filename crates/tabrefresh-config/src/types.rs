//! Config file types.
//!
//! Every field is optional on disk so that files can be layered; accessor
//! methods resolve missing values to the built-in defaults.

use serde::{Deserialize, Serialize};
use tabrefresh_protocol::GlobalSettings;

use crate::defaults;

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRefreshConfig {
    /// Global preferences applied to every tab (`[defaults]`).
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Scheduler tuning (`[scheduler]`).
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// `[defaults]` section: the on-disk form of [`GlobalSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_refresh: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_resource_monitoring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_check_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_refresh_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_sound_effects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ticking_sound: Option<bool>,
}

impl DefaultsConfig {
    /// Resolve to concrete settings, filling gaps with built-in defaults.
    pub fn to_global_settings(&self) -> GlobalSettings {
        let base = GlobalSettings::default();
        GlobalSettings {
            show_notifications: self.show_notifications.unwrap_or(base.show_notifications),
            confirm_refresh: self.confirm_refresh.unwrap_or(base.confirm_refresh),
            default_interval: self.default_interval.unwrap_or(base.default_interval),
            enable_resource_monitoring: self
                .enable_resource_monitoring
                .unwrap_or(base.enable_resource_monitoring),
            resource_check_interval: self
                .resource_check_interval
                .unwrap_or(base.resource_check_interval),
            startup_refresh_mode: self
                .startup_refresh_mode
                .unwrap_or(base.startup_refresh_mode),
            language: self.language.clone().unwrap_or(base.language),
            enable_sound_effects: self
                .enable_sound_effects
                .unwrap_or(base.enable_sound_effects),
            enable_ticking_sound: self
                .enable_ticking_sound
                .unwrap_or(base.enable_ticking_sound),
        }
    }

    /// Merge two sections. Values set in `override_config` win.
    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            show_notifications: override_config
                .show_notifications
                .or(base.show_notifications),
            confirm_refresh: override_config.confirm_refresh.or(base.confirm_refresh),
            default_interval: override_config.default_interval.or(base.default_interval),
            enable_resource_monitoring: override_config
                .enable_resource_monitoring
                .or(base.enable_resource_monitoring),
            resource_check_interval: override_config
                .resource_check_interval
                .or(base.resource_check_interval),
            startup_refresh_mode: override_config
                .startup_refresh_mode
                .or(base.startup_refresh_mode),
            language: override_config
                .language
                .clone()
                .or_else(|| base.language.clone()),
            enable_sound_effects: override_config
                .enable_sound_effects
                .or(base.enable_sound_effects),
            enable_ticking_sound: override_config
                .enable_ticking_sound
                .or(base.enable_ticking_sound),
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rearm_buffer_ms: Option<u64>,
}

impl SchedulerConfig {
    pub fn prompt_timeout_secs(&self) -> u64 {
        self.prompt_timeout_secs
            .unwrap_or(defaults::DEFAULT_PROMPT_TIMEOUT_SECS)
    }

    pub fn rearm_buffer_ms(&self) -> u64 {
        self.rearm_buffer_ms
            .unwrap_or(defaults::DEFAULT_REARM_BUFFER_MS)
    }

    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            prompt_timeout_secs: override_config
                .prompt_timeout_secs
                .or(base.prompt_timeout_secs),
            rearm_buffer_ms: override_config.rearm_buffer_ms.or(base.rearm_buffer_ms),
        }
    }
}
