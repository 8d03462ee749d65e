//! # tabrefresh-config
//!
//! TOML configuration types, loading, and validation for tabrefresh.
//!
//! Single source of truth for the `[defaults]` and `[scheduler]` sections of
//! `~/.tabrefresh/config.toml`. The `[daemon]` section belongs to the daemon.

mod defaults;
mod loading;
mod validation;

pub mod errors;
pub mod types;

// Public API re-exports
pub use defaults::{
    DEFAULT_INTERVAL_SECS, DEFAULT_PROMPT_TIMEOUT_SECS, DEFAULT_REARM_BUFFER_MS,
    DEFAULT_RESOURCE_CHECK_INTERVAL_SECS, MAX_REARM_BUFFER_MS,
};
pub use errors::ConfigError;
pub use loading::{CONFIG_ENV_VAR, load_config_file, load_hierarchy_from, merge_configs};
pub use types::{DefaultsConfig, SchedulerConfig, TabRefreshConfig};
pub use validation::{sanitize_global_settings, validate_config};

impl TabRefreshConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, Box<dyn std::error::Error>> {
        loading::load_hierarchy()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }

    /// Global settings from `[defaults]`, sanitized.
    pub fn global_settings(&self) -> tabrefresh_protocol::GlobalSettings {
        sanitize_global_settings(self.defaults.to_global_settings())
    }
}
