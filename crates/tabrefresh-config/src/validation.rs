//! Configuration validation and settings sanitization.

use tabrefresh_protocol::GlobalSettings;
use tracing::warn;

use crate::defaults;
use crate::errors::ConfigError;
use crate::types::TabRefreshConfig;

/// Validate a TabRefreshConfig, returning an error if any values are invalid.
///
/// # Validation Rules
///
/// - `scheduler.prompt_timeout_secs` must be at least 1
/// - `scheduler.rearm_buffer_ms` must not exceed [`defaults::MAX_REARM_BUFFER_MS`]
/// - `defaults.language`, if set, must not be blank
///
/// Out-of-range intervals in `[defaults]` are not errors; they are reset by
/// [`sanitize_global_settings`].
pub fn validate_config(config: &TabRefreshConfig) -> Result<(), ConfigError> {
    if config.scheduler.prompt_timeout_secs() == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "scheduler.prompt_timeout_secs must be at least 1".to_string(),
        });
    }

    let buffer = config.scheduler.rearm_buffer_ms();
    if buffer > defaults::MAX_REARM_BUFFER_MS {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "scheduler.rearm_buffer_ms is {} but must be at most {}",
                buffer,
                defaults::MAX_REARM_BUFFER_MS
            ),
        });
    }

    if let Some(ref language) = config.defaults.language
        && language.trim().is_empty()
    {
        return Err(ConfigError::InvalidConfiguration {
            message: "defaults.language must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Reset out-of-range values to their defaults.
///
/// Mirrors the settings page: intervals below one second fall back to the
/// built-in values instead of being rejected.
pub fn sanitize_global_settings(mut settings: GlobalSettings) -> GlobalSettings {
    if settings.default_interval < 1 {
        warn!(
            event = "config.settings.default_interval_reset",
            value = settings.default_interval,
            fallback = defaults::DEFAULT_INTERVAL_SECS,
        );
        settings.default_interval = defaults::DEFAULT_INTERVAL_SECS;
    }
    if settings.resource_check_interval < 1 {
        warn!(
            event = "config.settings.resource_check_interval_reset",
            value = settings.resource_check_interval,
            fallback = defaults::DEFAULT_RESOURCE_CHECK_INTERVAL_SECS,
        );
        settings.resource_check_interval = defaults::DEFAULT_RESOURCE_CHECK_INTERVAL_SECS;
    }
    if settings.language.trim().is_empty() {
        settings.language = defaults::DEFAULT_LANGUAGE.to_string();
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchedulerConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TabRefreshConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_prompt_timeout_rejected() {
        let config = TabRefreshConfig {
            scheduler: SchedulerConfig {
                prompt_timeout_secs: Some(0),
                rearm_buffer_ms: None,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidConfiguration { .. }
        ));
    }

    #[test]
    fn test_excessive_rearm_buffer_rejected() {
        let config = TabRefreshConfig {
            scheduler: SchedulerConfig {
                prompt_timeout_secs: None,
                rearm_buffer_ms: Some(60_000),
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("rearm_buffer_ms"));
    }

    #[test]
    fn test_blank_language_rejected() {
        let mut config = TabRefreshConfig::default();
        config.defaults.language = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_sanitize_resets_zero_intervals() {
        let settings = GlobalSettings {
            default_interval: 0,
            resource_check_interval: 0,
            language: String::new(),
            ..Default::default()
        };
        let sanitized = sanitize_global_settings(settings);
        assert_eq!(sanitized.default_interval, 30);
        assert_eq!(sanitized.resource_check_interval, 5);
        assert_eq!(sanitized.language, "en");
    }

    #[test]
    fn test_sanitize_keeps_valid_values() {
        let settings = GlobalSettings {
            default_interval: 90,
            confirm_refresh: false,
            ..Default::default()
        };
        let sanitized = sanitize_global_settings(settings.clone());
        assert_eq!(sanitized, settings);
    }
}
