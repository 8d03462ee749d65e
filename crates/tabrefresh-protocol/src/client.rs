//! Synchronous JSONL IPC client for the tabrefresh daemon's Unix socket.
//!
//! Provides `IpcConnection` for sending typed `ClientMessage` requests and
//! reading typed `DaemonMessage` responses. Subscribed connections also
//! receive pushes, which `recv()` yields one at a time.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use crate::{ClientMessage, DaemonMessage, ErrorCode};

/// Error from the IPC client layer.
#[non_exhaustive]
#[derive(Debug)]
pub enum IpcError {
    /// Daemon socket does not exist or connection was refused.
    NotRunning { path: String },
    /// Socket exists but connection failed for a non-`ConnectionRefused` reason.
    ConnectionFailed(std::io::Error),
    /// Daemon returned an explicit error response.
    DaemonError { code: ErrorCode, message: String },
    /// Protocol-level error (serialization, empty response, invalid JSON).
    ProtocolError { message: String },
    /// Other I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for IpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpcError::NotRunning { path } => {
                write!(f, "Daemon is not running (socket not found at {})", path)
            }
            IpcError::ConnectionFailed(e) => write!(f, "Connection failed: {}", e),
            IpcError::DaemonError { code, message } => {
                write!(f, "Daemon error [{}]: {}", code, message)
            }
            IpcError::ProtocolError { message } => write!(f, "Protocol error: {}", message),
            IpcError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for IpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpcError::ConnectionFailed(e) | IpcError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IpcError {
    fn from(e: std::io::Error) -> Self {
        IpcError::Io(e)
    }
}

/// A synchronous JSONL connection to the tabrefresh daemon.
#[derive(Debug)]
pub struct IpcConnection {
    writer: UnixStream,
    // Kept for the connection's lifetime: pushes may arrive back-to-back and
    // must not be lost between reads.
    reader: BufReader<UnixStream>,
}

impl IpcConnection {
    /// Connect to the daemon at the given Unix socket path.
    ///
    /// Checks that the socket file exists, connects, and configures timeouts
    /// (30s read, 5s write). Returns `IpcError::NotRunning` if the socket
    /// doesn't exist or connection is refused.
    pub fn connect(socket_path: &Path) -> Result<Self, IpcError> {
        if !socket_path.exists() {
            return Err(IpcError::NotRunning {
                path: socket_path.display().to_string(),
            });
        }

        let stream = UnixStream::connect(socket_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                IpcError::NotRunning {
                    path: socket_path.display().to_string(),
                }
            } else {
                IpcError::ConnectionFailed(e)
            }
        })?;

        stream.set_read_timeout(Some(Duration::from_secs(30)))?;
        stream.set_write_timeout(Some(Duration::from_secs(5)))?;

        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            writer: stream,
            reader,
        })
    }

    /// Send a typed request and read its typed response.
    ///
    /// Pushes that arrive before the response (on a subscribed connection)
    /// are skipped. Converts `DaemonMessage::Error` into `IpcError::DaemonError`.
    pub fn send(&mut self, request: &ClientMessage) -> Result<DaemonMessage, IpcError> {
        let msg = serde_json::to_string(request).map_err(|e| IpcError::ProtocolError {
            message: e.to_string(),
        })?;

        writeln!(self.writer, "{}", msg)?;
        self.writer.flush()?;

        loop {
            let response = self.read_one()?;
            if response.is_push() {
                continue;
            }
            if let DaemonMessage::Error { code, message, .. } = response {
                return Err(IpcError::DaemonError { code, message });
            }
            return Ok(response);
        }
    }

    /// Block until the next message from the daemon (used by `watch`).
    pub fn recv(&mut self) -> Result<DaemonMessage, IpcError> {
        self.read_one()
    }

    fn read_one(&mut self) -> Result<DaemonMessage, IpcError> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;

        if line.is_empty() {
            return Err(IpcError::ProtocolError {
                message: "Empty response from daemon".to_string(),
            });
        }

        serde_json::from_str(&line).map_err(|e| IpcError::ProtocolError {
            message: format!("Invalid JSON response: {}", e),
        })
    }

    /// Override the read timeout on the underlying socket.
    ///
    /// `None` blocks indefinitely, which is what `watch` wants.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), IpcError> {
        Ok(self.writer.set_read_timeout(timeout)?)
    }
}
