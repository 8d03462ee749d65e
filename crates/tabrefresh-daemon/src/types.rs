use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tabrefresh_paths::TabRefreshPaths;

use crate::errors::DaemonError;

/// Daemon-specific configuration.
///
/// Read from the `[daemon]` section of `~/.tabrefresh/config.toml`.
/// The daemon reads this itself; tabrefresh-config does not carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the Unix domain socket.
    /// Default: `~/.tabrefresh/daemon.sock`
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Path to the PID file.
    /// Default: `~/.tabrefresh/daemon.pid`
    #[serde(default = "default_pid_path")]
    pub pid_path: PathBuf,

    /// Durable store for counters, countdowns, settings and snapshots.
    /// Default: `~/.tabrefresh/state.json`
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Seconds to wait for open connections to drain during shutdown.
    /// Default: 5
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl DaemonConfig {
    /// Every path rooted at `paths`, other values defaulted. Use in tests.
    pub fn from_paths(paths: &TabRefreshPaths) -> Self {
        Self {
            socket_path: paths.daemon_socket(),
            pid_path: paths.daemon_pid_file(),
            state_path: paths.state_file(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.shutdown_timeout_secs == 0 {
            return Err(DaemonError::ConfigInvalid(
                "shutdown_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.socket_path == self.state_path || self.pid_path == self.state_path {
            return Err(DaemonError::ConfigInvalid(
                "state_path must differ from socket_path and pid_path".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_paths(&TabRefreshPaths::resolve_or_tmp())
    }
}

fn default_socket_path() -> PathBuf {
    TabRefreshPaths::resolve_or_tmp().daemon_socket()
}

fn default_pid_path() -> PathBuf {
    TabRefreshPaths::resolve_or_tmp().daemon_pid_file()
}

fn default_state_path() -> PathBuf {
    TabRefreshPaths::resolve_or_tmp().state_file()
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

/// Just enough of the config file to extract the `[daemon]` section.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    daemon: DaemonConfig,
}

/// Load daemon configuration from `~/.tabrefresh/config.toml`.
///
/// Falls back to defaults if the file doesn't exist, can't be parsed, or
/// the section is missing. Only invalid values are an error.
pub fn load_daemon_config() -> Result<DaemonConfig, DaemonError> {
    load_daemon_config_from(&TabRefreshPaths::resolve_or_tmp())
}

pub fn load_daemon_config_from(paths: &TabRefreshPaths) -> Result<DaemonConfig, DaemonError> {
    let config_path = paths.user_config();

    let config = match std::fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(file) => file.daemon,
            Err(e) => {
                tracing::warn!(
                    event = "daemon.config.parse_failed",
                    path = %config_path.display(),
                    error = %e,
                );
                DaemonConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DaemonConfig::default(),
        Err(e) => {
            tracing::warn!(
                event = "daemon.config.read_failed",
                path = %config_path.display(),
                error = %e,
            );
            DaemonConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}
