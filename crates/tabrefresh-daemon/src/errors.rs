use std::io;

use tabrefresh_core::{CoordinatorError, RefreshError, StoreError};

/// All error types for the tabrefresh-daemon crate.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon not running")]
    NotRunning,

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("daemon already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("invalid daemon configuration: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),
}

impl DaemonError {
    /// Error code string for the IPC protocol.
    pub fn error_code(&self) -> &'static str {
        match self {
            DaemonError::NotRunning => "daemon_not_running",
            DaemonError::ProtocolError(_) => "protocol_error",
            DaemonError::AlreadyRunning(_) => "daemon_already_running",
            DaemonError::ConfigInvalid(_) => "config_invalid",
            DaemonError::Io(_) => "io_error",
            DaemonError::Serde(_) => "serialization_error",
            DaemonError::Coordinator(e) => e.error_code(),
            DaemonError::Store(e) => e.error_code(),
        }
    }

    /// Whether this error is caused by user input.
    pub fn is_user_error(&self) -> bool {
        match self {
            DaemonError::AlreadyRunning(_) | DaemonError::ConfigInvalid(_) => true,
            DaemonError::Coordinator(e) => e.is_user_error(),
            _ => false,
        }
    }
}
