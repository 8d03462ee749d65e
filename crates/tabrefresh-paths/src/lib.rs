use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found, set $HOME environment variable")]
    HomeNotFound,
}

/// Centralized path construction for the `~/.tabrefresh/` directory layout.
///
/// Single source of truth for every path under `~/.tabrefresh/`. Use `resolve()`
/// in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct TabRefreshPaths {
    base_dir: PathBuf,
}

impl TabRefreshPaths {
    /// Resolve paths from the user's home directory (`~/.tabrefresh`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            base_dir: home.join(".tabrefresh"),
        })
    }

    /// Resolve from the home directory, falling back to `/tmp/.tabrefresh`.
    ///
    /// Used for defaults that must always produce a path (socket, pid, state).
    pub fn resolve_or_tmp() -> Self {
        Self::resolve().unwrap_or_else(|_| Self::from_dir(PathBuf::from("/tmp/.tabrefresh")))
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// The base `~/.tabrefresh` directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // --- Top-level files ---

    pub fn daemon_socket(&self) -> PathBuf {
        self.base_dir.join("daemon.sock")
    }

    pub fn daemon_pid_file(&self) -> PathBuf {
        self.base_dir.join("daemon.pid")
    }

    pub fn user_config(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Durable key-value store backing counters, countdowns and snapshots.
    pub fn state_file(&self) -> PathBuf {
        self.base_dir.join("state.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn daemon_log_file(&self) -> PathBuf {
        self.logs_dir().join("daemon.log")
    }
}
