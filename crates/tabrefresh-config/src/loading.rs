//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.tabrefresh/config.toml`
//! 3. **Override file** - the path in `$TABREFRESH_CONFIG`, if set

use std::fs;
use std::path::Path;

use tabrefresh_paths::TabRefreshPaths;

use crate::types::{DefaultsConfig, SchedulerConfig, TabRefreshConfig};
use crate::validation::validate_config;

/// Environment variable naming an extra config file layered over the user config.
pub const CONFIG_ENV_VAR: &str = "TABREFRESH_CONFIG";

/// Check if an error is a "file not found" error.
fn is_file_not_found(e: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
        return io_err.kind() == std::io::ErrorKind::NotFound;
    }
    false
}

/// Load configuration from the hierarchy of config files.
///
/// # Errors
///
/// Returns an error if a present file fails to parse or the merged config
/// fails validation. A missing user config is not an error; a missing
/// `$TABREFRESH_CONFIG` file is, since it was asked for explicitly.
pub fn load_hierarchy() -> Result<TabRefreshConfig, Box<dyn std::error::Error>> {
    let paths = TabRefreshPaths::resolve().map_err(|e| e.to_string())?;
    load_hierarchy_from(&paths)
}

/// Same as [`load_hierarchy`] but rooted at explicit paths. Use in tests.
pub fn load_hierarchy_from(
    paths: &TabRefreshPaths,
) -> Result<TabRefreshConfig, Box<dyn std::error::Error>> {
    let mut config = TabRefreshConfig::default();

    match load_config_file(&paths.user_config()) {
        Ok(user_config) => config = merge_configs(config, user_config),
        Err(e) if !is_file_not_found(e.as_ref()) => return Err(e),
        Err(_) => {}
    }

    if let Ok(override_path) = std::env::var(CONFIG_ENV_VAR)
        && !override_path.trim().is_empty()
    {
        let override_config = load_config_file(Path::new(&override_path))?;
        config = merge_configs(config, override_config);
    }

    validate_config(&config)?;

    Ok(config)
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<TabRefreshConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| std::io::Error::new(e.kind(), format!("'{}': {}", path.display(), e)))?;
    let config: TabRefreshConfig = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;
    Ok(config)
}

/// Merge two configurations, with override_config taking precedence.
pub fn merge_configs(base: TabRefreshConfig, override_config: TabRefreshConfig) -> TabRefreshConfig {
    TabRefreshConfig {
        defaults: DefaultsConfig::merge(&base.defaults, &override_config.defaults),
        scheduler: SchedulerConfig::merge(&base.scheduler, &override_config.scheduler),
    }
}
